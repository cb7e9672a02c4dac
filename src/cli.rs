// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{RawConfig, parse_kv_pairs};
use crate::errors::Result;

/// Command-line arguments for `otel-exec`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "otel-exec",
    version,
    about = "Run a command inside an OpenTelemetry span.",
    long_about = "Run COMMAND as a child process, measure it with a span and send the span \
to an OTLP/HTTP collector. The span's traceparent is passed to the child as TRACEPARENT, \
so nested invocations join the same trace. The exit code is always the child's.\n\n\
Example:\n  otel-exec --endpoint localhost:4318 -s build -- make -j8"
)]
pub struct CliArgs {
    /// Optional TOML config file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// OTLP/HTTP base endpoint; `/v1/traces` is appended. No endpoint means
    /// no span is recorded and context is only passed through.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// OTLP/HTTP traces endpoint, used verbatim.
    #[arg(long, value_name = "URL")]
    pub traces_endpoint: Option<String>,

    /// Extra request headers, e.g. `x-api-key=abc`.
    #[arg(long = "otlp-headers", value_name = "KEY=VALUE", value_delimiter = ',')]
    pub headers: Vec<String>,

    /// Time budget for exporting the span, starting after the command exits.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Time budget for the command itself; 0 waits forever.
    #[arg(long, value_name = "DURATION")]
    pub command_timeout: Option<String>,

    #[arg(long = "service", short = 'n', value_name = "NAME")]
    pub service_name: Option<String>,

    /// Span name; defaults to the program name.
    #[arg(long = "name", short = 's', value_name = "NAME")]
    pub span_name: Option<String>,

    /// Span kind (internal, server, client, producer, consumer).
    #[arg(long, short = 'k', value_name = "KIND")]
    pub kind: Option<String>,

    /// Extra span attributes.
    #[arg(long = "attrs", short = 'a', value_name = "KEY=VALUE", value_delimiter = ',')]
    pub attributes: Vec<String>,

    /// File to read the inherited traceparent from and write the new one to.
    #[arg(long, value_name = "PATH")]
    pub tp_carrier: Option<PathBuf>,

    /// Ignore TRACEPARENT from the environment and do not pass one through.
    #[arg(long)]
    pub tp_ignore_env: bool,

    /// Print the propagated traceparent to stdout after the run.
    #[arg(long)]
    pub tp_print: bool,

    /// With --tp-print, prefix the line with `export `.
    #[arg(long)]
    pub tp_export: bool,

    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OTEL_EXEC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// The command to run, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// The configuration layer given on the command line.
    pub fn config_overrides(&self) -> Result<RawConfig> {
        let headers = if self.headers.is_empty() {
            None
        } else {
            Some(parse_kv_pairs("--otlp-headers", &self.headers)?)
        };
        let attributes = if self.attributes.is_empty() {
            None
        } else {
            Some(parse_kv_pairs("--attrs", &self.attributes)?)
        };

        Ok(RawConfig {
            endpoint: self.endpoint.clone(),
            traces_endpoint: self.traces_endpoint.clone(),
            headers,
            timeout: self.timeout.clone(),
            command_timeout: self.command_timeout.clone(),
            service_name: self.service_name.clone(),
            span_name: self.span_name.clone(),
            kind: self.kind.clone(),
            attributes,
            tp_carrier: self.tp_carrier.clone(),
            tp_ignore_env: self.tp_ignore_env.then_some(true),
            tp_print: self.tp_print.then_some(true),
            tp_export: self.tp_export.then_some(true),
            verbose: self.verbose.then_some(true),
        })
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
