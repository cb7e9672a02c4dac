mod common;

use std::time::Duration;

use otel_exec::exec::RelaySignal;
use otel_exec::fs::mock::MockFileSystem;
use otel_exec_test_utils::builders::ConfigBuilder;
use otel_exec_test_utils::fake_exporter::FakeExporter;
use otel_exec_test_utils::signals::{deliver_after, silent};
use otel_exec_test_utils::{init_tracing, with_timeout};

use common::{argv, clean_env, run_with_signals};

#[cfg(unix)]
#[tokio::test]
async fn interrupt_is_forwarded_and_child_exit_code_wins() {
    init_tracing();
    let config = ConfigBuilder::new().recording().build();
    let mut exporter = FakeExporter::accepting();
    let rx = deliver_after(Duration::from_millis(300), RelaySignal::Interrupt);

    let run = with_timeout(run_with_signals(
        &config,
        argv(&["sh", "-c", "trap 'exit 42' INT; sleep 5 & wait"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
        rx,
    ))
    .await;

    assert_eq!(run.report.exit_code, 42);
    assert_eq!(run.report.relay.received, Some(RelaySignal::Interrupt));
    assert!(run.report.relay.delivered);
    // The span is still exported after the interruption.
    assert_eq!(exporter.sent().len(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn terminate_kills_a_child_without_a_handler() {
    init_tracing();
    let config = ConfigBuilder::new().build();
    let mut exporter = FakeExporter::accepting();
    let rx = deliver_after(Duration::from_millis(300), RelaySignal::Terminate);

    let run = with_timeout(run_with_signals(
        &config,
        argv(&["sleep", "5"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
        rx,
    ))
    .await;

    assert_eq!(run.report.exit_code, 128 + libc_sigterm());
    assert!(run.report.relay.delivered);
}

#[tokio::test]
async fn quiet_run_reports_no_signal() {
    init_tracing();
    let config = ConfigBuilder::new().build();
    let mut exporter = FakeExporter::accepting();
    let rx = silent();

    let run = with_timeout(run_with_signals(
        &config,
        argv(&["true"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
        rx,
    ))
    .await;

    assert_eq!(run.report.relay.received, None);
    assert!(!run.report.relay.delivered);
}

#[cfg(unix)]
fn libc_sigterm() -> i32 {
    RelaySignal::Terminate.as_raw()
}
