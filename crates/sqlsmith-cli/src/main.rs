mod cli;
mod dut;
mod error;
mod schema_loader;
mod stats;

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Args;
use dut::{Dut, Outcome};
use sqlsmith_core::{GraphmlDumper, Production, Rng, Scope};
use stats::{ErrorTally, RunStats};

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("sqlsmith: error: failed to start async runtime: {e:#}");
            return ExitCode::from(70);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sqlsmith: error: {e:#}");
            ExitCode::from(66)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(args: Args) -> Result<()> {
    if args.exclude_catalog.is_some() {
        tracing::debug!(
            "--exclude-catalog has no effect: information_schema rows are already excluded by the schema filter"
        );
    }

    let schema = args
        .mysql
        .rsplit_once('/')
        .map(|(_, db)| db.to_string())
        .filter(|s| !s.is_empty());

    let catalog = schema_loader::load_mysql_schema(&args.mysql, schema.as_deref())
        .await
        .context("failed to load schema")?;

    if catalog.tables.is_empty() {
        anyhow::bail!(error::HostError::EmptySchema);
    }

    let mut rng = match (&args.rng_state, args.seed) {
        (Some(state), _) => state
            .parse::<Rng>()
            .map_err(|e| error::HostError::InvalidRngState(e.to_string()))
            .context("failed to parse --rng-state")?,
        (None, Some(seed)) => Rng::seed_from_u64(seed),
        (None, None) => Rng::seed_from_u64(std::process::id() as u64),
    };

    let dut = if args.dry_run {
        None
    } else {
        Some(Dut::connect(&args.mysql).await.context("failed to connect to device under test")?)
    };

    let mut ast_sink = match &args.dump_ast {
        Some(path) => Some(BufWriter::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open {} for --dump-ast", path.display()))?,
        )),
        None => None,
    };

    let catalog = std::sync::Arc::new(catalog);
    let mut run_stats = RunStats::new();
    let mut errors = ErrorTally::new();
    let mut generated: u64 = 0;
    let mut graph_index: u64 = 0;

    loop {
        if let Some(max) = args.max_queries {
            if generated >= max {
                break;
            }
        }

        let mut scope = Scope::root(catalog.clone());
        let query = match sqlsmith_core::statement_factory(&mut scope, &mut rng) {
            Ok(query) => query,
            Err(e) => {
                tracing::debug!(error = %e, "statement construction gave up, trying again");
                continue;
            }
        };
        generated += 1;
        run_stats.record_statement(&query);

        if args.dump_queries {
            stats::dump_query(&mut io::stdout(), &query).context("failed to write query dump")?;
        }

        if let Some(out) = ast_sink.as_mut() {
            let mut dumper = GraphmlDumper::new(out, graph_index);
            graph_index += 1;
            dumper.start().context("failed to write AST dump")?;
            query.accept(&mut dumper);
            dumper.finish().context("failed to write AST dump")?;
        }

        let Some(dut) = dut.as_ref() else {
            continue;
        };

        let outcome = dut.test(&query.to_sql()).await;
        run_stats.record_outcome(&outcome);
        match &outcome {
            Outcome::Success | Outcome::Syntax | Outcome::Timeout => {}
            Outcome::Broken => {
                tracing::warn!("device under test connection lost, reconnecting");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Outcome::Other(message) => {
                errors.record(message);
            }
        }
    }

    if let Some(out) = ast_sink.as_mut() {
        out.flush().context("failed to flush --dump-ast output")?;
    }

    run_stats.log_summary();
    errors.log_summary();
    Ok(())
}
