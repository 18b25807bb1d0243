//! Host-boundary errors: everything outside the grammar engine's own
//! recoverable [`sqlsmith_core::ProductionError`] channel.
//!
//! These are failures the generator itself cannot retry its way out of —
//! a bad connection string, a schema with no tables, the device under test
//! going away mid-run. `main` wraps these in `anyhow::Context` at the call
//! site; this enum exists so the underlying cause (including the MySQL
//! error code, where relevant) survives the `anyhow` wrapping for anyone
//! inspecting the error programmatically.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to load schema from {url}")]
    SchemaLoad {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("schema has no base tables to generate queries against")]
    EmptySchema,

    #[error("invalid RNG state: {0}")]
    InvalidRngState(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_schema_display() {
        let e = HostError::EmptySchema;
        assert_eq!(
            e.to_string(),
            "schema has no base tables to generate queries against"
        );
    }

    #[test]
    fn test_invalid_rng_state_display() {
        let e = HostError::InvalidRngState("zz".to_string());
        assert_eq!(e.to_string(), "invalid RNG state: zz");
    }
}
