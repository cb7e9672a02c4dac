mod common;

use std::time::{Duration, Instant};

use otel_exec::exec::ExecFailure;
use otel_exec::export::ExportError;
use otel_exec::fs::mock::MockFileSystem;
use otel_exec::types::StatusCode;
use otel_exec_test_utils::builders::ConfigBuilder;
use otel_exec_test_utils::fake_exporter::{FakeExporter, SendBehaviour};
use otel_exec_test_utils::{init_tracing, with_timeout};

use common::{argv, clean_env, run};

#[tokio::test]
async fn command_deadline_kills_the_child() {
    init_tracing();
    let config = ConfigBuilder::new()
        .recording()
        .command_timeout("100ms")
        .build();
    let mut exporter = FakeExporter::accepting();

    let started = Instant::now();
    let run = with_timeout(run(
        &config,
        argv(&["sleep", "10"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    assert_eq!(run.report.exit_code, 137);
    assert!(matches!(
        run.report.failure,
        Some(ExecFailure::DeadlineExceeded { .. })
    ));
    assert_eq!(run.report.span.status(), StatusCode::Error);

    let duration = run.report.span.duration().expect("span ended");
    assert!(duration >= Duration::from_millis(100));
    assert!(duration < Duration::from_secs(5));
    assert_eq!(exporter.sent().len(), 1);
}

#[tokio::test]
async fn zero_command_timeout_means_unbounded() {
    init_tracing();
    let config = ConfigBuilder::new().command_timeout("0").build();
    assert_eq!(config.timeouts().command, None);

    let mut exporter = FakeExporter::accepting();
    let run = with_timeout(run(
        &config,
        argv(&["sleep", "0.2"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 0);
}

#[tokio::test]
async fn stalled_export_is_cut_off_and_exit_code_is_unaffected() {
    init_tracing();
    let config = ConfigBuilder::new()
        .recording()
        .export_timeout("50ms")
        .build();
    let mut exporter = FakeExporter::new(SendBehaviour::Stall(Duration::from_secs(30)));

    let started = Instant::now();
    let run = with_timeout(run(
        &config,
        argv(&["true"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(run.report.exit_code, 0);
    match &run.report.export.send {
        Err(err @ ExportError::Deadline(_)) => assert!(err.is_timeout()),
        other => panic!("expected export deadline, got {other:?}"),
    }
    assert!(exporter.sent().is_empty());
}

#[tokio::test]
async fn export_window_starts_after_the_command_finishes() {
    init_tracing();
    // The command outlives the export timeout; the export must still succeed.
    let config = ConfigBuilder::new()
        .recording()
        .export_timeout("100ms")
        .build();
    let mut exporter = FakeExporter::new(SendBehaviour::Stall(Duration::from_millis(20)));

    let run = with_timeout(run(
        &config,
        argv(&["sleep", "0.3"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 0);
    assert!(run.report.export.is_clean(), "{:?}", run.report.export);
    let sent = exporter.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is_ended());
    assert_eq!(sent[0].span_id(), run.report.span.span_id());
    assert_eq!(exporter.shutdown_calls(), 1);
}

#[tokio::test]
async fn span_duration_excludes_export_latency() {
    init_tracing();
    let config = ConfigBuilder::new()
        .recording()
        .export_timeout("5s")
        .build();
    let mut exporter = FakeExporter::new(SendBehaviour::Stall(Duration::from_millis(400)));

    let started = Instant::now();
    let run = with_timeout(run(
        &config,
        argv(&["true"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    // The whole run waited on the exporter...
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert!(run.report.export.is_clean(), "{:?}", run.report.export);

    // ...but the span only covers the command.
    let duration = run.report.span.duration().expect("span ended");
    assert!(duration < Duration::from_millis(300), "span lasted {duration:?}");
    assert_eq!(exporter.sent()[0].duration(), Some(duration));
}

#[tokio::test]
async fn failing_exporter_does_not_change_exit_code() {
    init_tracing();
    let config = ConfigBuilder::new().recording().build();
    let mut exporter = FakeExporter::new(SendBehaviour::Fail).failing_shutdown();

    let run = with_timeout(run(
        &config,
        argv(&["sh", "-c", "exit 3"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 3);
    assert!(run.report.export.send.is_err());
    assert!(run.report.export.shutdown.is_err());
    assert_eq!(exporter.shutdown_calls(), 1);
}
