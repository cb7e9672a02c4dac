mod common;

use otel_exec::exec::{ATTR_ARGUMENTS, ATTR_COMMAND, ExecFailure};
use otel_exec::fs::mock::MockFileSystem;
use otel_exec::types::StatusCode;
use otel_exec_test_utils::builders::ConfigBuilder;
use otel_exec_test_utils::fake_exporter::FakeExporter;
use otel_exec_test_utils::{init_tracing, with_timeout};

use common::{argv, clean_env, run};

#[tokio::test]
async fn successful_command_exits_zero_and_leaves_status_unset() {
    init_tracing();
    let config = ConfigBuilder::new().recording().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["true"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 0);
    assert!(run.report.failure.is_none());
    assert_eq!(run.report.span.status(), StatusCode::Unset);
    assert!(run.report.span.is_ended());
    assert_eq!(run.report.span.attribute(ATTR_COMMAND), Some("true"));
    assert_eq!(run.report.span.attribute(ATTR_ARGUMENTS), Some(""));
}

#[tokio::test]
async fn nonzero_exit_is_passed_through_and_marks_span_error() {
    init_tracing();
    let config = ConfigBuilder::new().recording().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["sh", "-c", "exit 7"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 7);
    assert!(matches!(run.report.failure, Some(ExecFailure::ExitStatus(7))));
    assert_eq!(run.report.span.status(), StatusCode::Error);
    assert!(
        run.report
            .span
            .status_message()
            .starts_with("exec command failed")
    );
    assert_eq!(run.report.span.attribute(ATTR_ARGUMENTS), Some("-c,exit 7"));
}

#[tokio::test]
async fn false_exits_one() {
    init_tracing();
    let config = ConfigBuilder::new().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["false"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 1);
    assert_eq!(run.report.span.status(), StatusCode::Error);
}

#[tokio::test]
async fn missing_program_exits_127_without_panicking() {
    init_tracing();
    let config = ConfigBuilder::new().recording().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["definitely-not-a-real-program-otel-exec"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 127);
    assert!(matches!(run.report.failure, Some(ExecFailure::Spawn { .. })));
    assert_eq!(run.report.span.status(), StatusCode::Error);
    // The span is still exported.
    assert_eq!(exporter.sent().len(), 1);
}

#[tokio::test]
async fn user_attributes_cannot_override_command_attributes() {
    init_tracing();
    let config = ConfigBuilder::new()
        .recording()
        .attribute("command", "spoofed")
        .attribute("team", "infra")
        .build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["echo", "a b", "c,d"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    let span = &run.report.span;
    assert_eq!(span.attribute(ATTR_COMMAND), Some("echo"));
    assert_eq!(span.attribute(ATTR_ARGUMENTS), Some("a b,\"c,d\""));
    assert_eq!(span.attribute("team"), Some("infra"));
}

#[tokio::test]
async fn span_name_defaults_to_program_and_can_be_overridden() {
    init_tracing();
    let mut exporter = FakeExporter::accepting();

    let default_name = ConfigBuilder::new().build();
    let run1 = run(
        &default_name,
        argv(&["true"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    )
    .await;
    assert_eq!(run1.report.span.name(), "true");

    let named = ConfigBuilder::new().span_name("build step").build();
    let run2 = run(
        &named,
        argv(&["true"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    )
    .await;
    assert_eq!(run2.report.span.name(), "build step");
}
