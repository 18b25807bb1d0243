//! The device under test: executes generated statements against a live
//! MySQL-compatible server and classifies what happened.

use std::time::Duration;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::{Error as SqlxError, MySqlPool};

use crate::error::HostError;

const MAX_CONNECTIONS: u32 = 1;
const ACQUIRE_TIMEOUT_SECS: u64 = 10;
/// Deadline for a single generated statement. The original has no analogous
/// constant (it relies on the server's own `max_execution_time`), but a
/// generator producing arbitrary joins/subqueries can trivially construct a
/// statement the server never returns from, so the driver enforces its own
/// deadline rather than trusting the schema to bound query cost.
const STATEMENT_TIMEOUT_SECS: u64 = 30;

/// MySQL error numbers that this driver treats as syntax-equivalent: the
/// query was rejected before execution, not because the server crashed or
/// the schema drifted underneath it. 1064 is the literal parse error; the
/// rest (unknown column, unknown table, ambiguous column, subquery returns
/// more than one row) are schema-shape mismatches the generator is allowed
/// to produce since it does not track every constraint (uniqueness,
/// cardinality) a real schema enforces.
const SYNTAX_LIKE_CODES: &[&str] = &["1064", "1054", "1247", "1052", "1093"];

/// The outcome of sending one generated statement to the device under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The statement executed without error.
    Success,
    /// Rejected as malformed or schema-inconsistent (see [`SYNTAX_LIKE_CODES`]).
    Syntax,
    /// The statement did not return before the driver's deadline.
    Timeout,
    /// The connection itself was lost or could not be reused.
    Broken,
    /// Any other error, not classified above.
    Other(String),
}

/// A connection to the device under test.
pub struct Dut {
    pool: MySqlPool,
}

impl Dut {
    pub async fn connect(url: &str) -> Result<Self, HostError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(url)
            .await
            .map_err(|e| HostError::Connect {
                url: crate::schema_loader::redact_url(url),
                source: e,
            })?;
        Ok(Self { pool })
    }

    /// Executes `sql` and classifies the result. Never returns `Err`: a
    /// broken connection is reported as `Outcome::Broken`, not propagated,
    /// so the caller's generate loop can decide whether to reconnect.
    pub async fn test(&self, sql: &str) -> Outcome {
        let deadline = Duration::from_secs(STATEMENT_TIMEOUT_SECS);
        match tokio::time::timeout(deadline, sqlx::query(sql).execute(&self.pool)).await {
            Ok(Ok(_)) => Outcome::Success,
            Ok(Err(e)) => classify(&e),
            Err(_elapsed) => Outcome::Timeout,
        }
    }
}

fn classify(err: &SqlxError) -> Outcome {
    match err {
        SqlxError::Database(db_err) => match db_err.code() {
            Some(code) if SYNTAX_LIKE_CODES.contains(&code.as_ref()) => Outcome::Syntax,
            _ => Outcome::Other(db_err.message().to_string()),
        },
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => Outcome::Broken,
        SqlxError::WorkerCrashed => Outcome::Broken,
        other => Outcome::Other(other.to_string()),
    }
}
