// src/logging.rs

//! Logging setup for `otel-exec` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `OTEL_EXEC_LOG` environment variable (e.g. "info", "debug")
//! 3. `info` when `verbose` is set (`--verbose`, `OTEL_EXEC_VERBOSE` or the
//!    config file), otherwise `warn`
//!
//! Logs are sent to STDERR; stdout belongs to the child and `--tp-print`.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, verbose: bool) -> Result<()> {
    let level = resolve_level(
        cli_level,
        std::env::var("OTEL_EXEC_LOG").ok().as_deref(),
        verbose,
    );

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn resolve_level(
    cli_level: Option<LogLevel>,
    env_level: Option<&str>,
    verbose: bool,
) -> tracing::Level {
    if let Some(lvl) = cli_level {
        return level_from_log_level(lvl);
    }
    if let Some(lvl) = env_level.and_then(parse_level_str) {
        return lvl;
    }
    if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
