// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod export;
pub mod fs;
pub mod logging;
pub mod trace;
pub mod types;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::config::load_config;
use crate::engine::{Invocation, run_traced};
use crate::exec::{CommandDescriptor, OsSignalSource, ProcessEnv};
use crate::export::{NullExporter, SpanExporter, exporter_from_config};
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// Resolves configuration, starts logging, installs the signal handlers,
/// runs the command inside a span and returns the exit code the process
/// should end with.
/// Errors are only returned for problems found before the child starts.
pub async fn run(args: CliArgs) -> Result<i32> {
    let env = ProcessEnv::from_current();
    let fs = RealFileSystem;

    let overrides = args.config_overrides()?;
    let config = load_config(&fs, args.config.as_deref(), &env, overrides)?;
    // `verbose` may come from any layer, so logging waits for the merged config.
    logging::init_logging(args.log_level, config.verbose)?;
    let command = CommandDescriptor::from_argv(args.command)?;
    debug!(
        endpoint = ?config.endpoint,
        recording = config.is_recording(),
        program = %command.program(),
        "configuration resolved"
    );

    // Installed before the child exists so an early Ctrl-C is not lost.
    let signals = OsSignalSource::register().context("installing signal handlers")?;

    let mut exporter: Box<dyn SpanExporter> = match exporter_from_config(&config) {
        Ok(exporter) => exporter,
        Err(err) => {
            warn!(error = %err, "unable to create span exporter; span will not be sent");
            Box::new(NullExporter)
        }
    };

    let mut stdout = std::io::stdout();
    let invocation = Invocation {
        config: &config,
        command,
        parent_env: &env,
        fs: &fs,
    };
    let report = run_traced(invocation, &mut exporter, signals, &mut stdout).await?;

    Ok(report.exit_code)
}
