// src/engine/runtime.rs

use std::io::Write;

use tracing::{debug, info};

use crate::config::Config;
use crate::errors::Result;
use crate::exec::{
    ChildPid, CommandDescriptor, DeadlineCoordinator, ExecFailure, ProcessEnv, RelayReport,
    SignalRelay, SignalSource, build_child_env, execute,
};
use crate::export::{ExportReport, SpanExporter, export_span};
use crate::fs::FileSystem;
use crate::trace::{SpanRecord, Traceparent, load_inherited, propagate, select_child_context};

/// Everything one traced run needs besides its collaborators.
#[derive(Debug)]
pub struct Invocation<'a> {
    pub config: &'a Config,
    pub command: CommandDescriptor,
    /// The wrapper's own environment; never modified.
    pub parent_env: &'a ProcessEnv,
    pub fs: &'a dyn FileSystem,
}

/// Result of a traced run.
#[derive(Debug)]
pub struct ExecReport {
    /// Code the wrapper must exit with: always the child's.
    pub exit_code: i32,
    pub failure: Option<ExecFailure>,
    pub span: SpanRecord,
    /// Context injected into the child, if any.
    pub child_context: Option<Traceparent>,
    pub relay: RelayReport,
    pub export: ExportReport,
}

/// Run the command inside a span and export the span.
///
/// Sequence:
/// 1. build the span and the child environment;
/// 2. start the signal relay, then spawn and wait (window 1);
/// 3. the span's end time is stamped as soon as the wait returns;
/// 4. release window 1, stop the relay and wait for it;
/// 5. open window 2 and export;
/// 6. write / print the propagated context.
///
/// Only building the span attributes can fail, before anything is spawned.
/// From the spawn on, every failure is recorded in the report instead.
pub async fn run_traced<E, S>(
    invocation: Invocation<'_>,
    exporter: &mut E,
    signals: S,
    out: &mut (dyn Write + Send),
) -> Result<ExecReport>
where
    E: SpanExporter + ?Sized,
    S: SignalSource,
{
    let Invocation {
        config,
        command,
        parent_env,
        fs,
    } = invocation;

    let inherited = load_inherited(config, parent_env, fs);
    let attributes = command.span_attributes(&config.attributes)?;
    let span_parent = if config.is_recording() {
        inherited
    } else {
        Traceparent::default()
    };
    let mut span = SpanRecord::start(
        config.span_name_for(command.program()),
        config.kind,
        &span_parent,
        attributes,
    );

    let child_context = select_child_context(config, &span, &inherited);
    let child_env = build_child_env(parent_env, child_context.as_ref());
    debug!(
        recording = config.is_recording(),
        inherited = inherited.is_initialized(),
        propagated = child_context.is_some(),
        "child environment ready"
    );

    let deadlines = DeadlineCoordinator::new(config.timeouts());
    let child_pid = ChildPid::new();
    let relay = SignalRelay::start(signals, child_pid.clone());

    let mut command_window = deadlines.begin_command();
    let outcome = execute(&command, &child_env, &command_window, &child_pid, &mut span).await;

    command_window.release();
    let relay_report = relay.stop().await;
    if let Some(signal) = relay_report.received {
        info!(?signal, delivered = relay_report.delivered, "signal relay finished");
    }

    let export_window = deadlines.begin_export(command_window);
    let export = export_span(exporter, &span, &export_window).await;
    drop(export_window);

    propagate(config, child_context.as_ref(), fs, out);

    Ok(ExecReport {
        exit_code: outcome.exit_code,
        failure: outcome.failure,
        span,
        child_context,
        relay: relay_report,
        export,
    })
}
