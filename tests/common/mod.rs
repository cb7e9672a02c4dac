#![allow(dead_code)]

use otel_exec::config::Config;
use otel_exec::engine::{ExecReport, Invocation, run_traced};
use otel_exec::exec::{CommandDescriptor, ProcessEnv, RelaySignal};
use otel_exec::export::SpanExporter;
use otel_exec::fs::FileSystem;
use otel_exec_test_utils::signals::silent;
use tokio::sync::mpsc;

/// Output of one traced run driven from a test.
pub struct Run {
    pub report: ExecReport,
    /// What the wrapper printed to its stdout.
    pub stdout: String,
}

pub fn argv(parts: &[&str]) -> CommandDescriptor {
    CommandDescriptor::from_argv(parts.iter().map(|p| p.to_string()).collect())
        .expect("non-empty argv")
}

/// The current environment with every `TRACEPARENT` entry removed.
pub fn clean_env() -> ProcessEnv {
    ProcessEnv::from_current()
        .iter()
        .filter(|(key, _)| key.to_str() != Some("TRACEPARENT"))
        .map(|(key, value)| (key.to_os_string(), value.to_os_string()))
        .collect()
}

/// Run `command` with no signals delivered.
pub async fn run<E: SpanExporter + ?Sized>(
    config: &Config,
    command: CommandDescriptor,
    env: &ProcessEnv,
    fs: &dyn FileSystem,
    exporter: &mut E,
) -> Run {
    run_with_signals(config, command, env, fs, exporter, silent()).await
}

pub async fn run_with_signals<E: SpanExporter + ?Sized>(
    config: &Config,
    command: CommandDescriptor,
    env: &ProcessEnv,
    fs: &dyn FileSystem,
    exporter: &mut E,
    signals: mpsc::Receiver<RelaySignal>,
) -> Run {
    let mut out: Vec<u8> = Vec::new();
    let report = run_traced(
        Invocation {
            config,
            command,
            parent_env: env,
            fs,
        },
        exporter,
        signals,
        &mut out,
    )
    .await
    .expect("run_traced failed before spawning");

    Run {
        report,
        stdout: String::from_utf8(out).expect("utf-8 output"),
    }
}
