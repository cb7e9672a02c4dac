mod common;

use std::fs;

use otel_exec::exec::ProcessEnv;
use otel_exec::fs::RealFileSystem;
use otel_exec::fs::mock::MockFileSystem;
use otel_exec::trace::{TRACEPARENT_ENV, Traceparent};
use otel_exec_test_utils::builders::ConfigBuilder;
use otel_exec_test_utils::fake_exporter::FakeExporter;
use otel_exec_test_utils::{init_tracing, with_timeout};
use tempfile::TempDir;

use common::{argv, clean_env, run};

const PARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

fn env_with_parent() -> ProcessEnv {
    let mut env = clean_env();
    env.push(TRACEPARENT_ENV, PARENT);
    env
}

/// Command that writes the child's `TRACEPARENT` (or nothing) to `path`.
fn dump_traceparent(path: &std::path::Path) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("printf '%s' \"${{TRACEPARENT:-}}\" > '{}'", path.display()),
    ]
}

#[tokio::test]
async fn recording_child_sees_the_new_span_as_parent() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let seen = tmp.path().join("seen");
    let config = ConfigBuilder::new().recording().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        otel_exec::exec::CommandDescriptor::from_argv(dump_traceparent(&seen)).unwrap(),
        &env_with_parent(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 0);
    let child_tp: Traceparent = fs::read_to_string(&seen).unwrap().parse().unwrap();
    let span = &run.report.span;

    assert_eq!(Some(child_tp), run.report.child_context);
    assert_eq!(child_tp.trace_id(), span.trace_id());
    assert_eq!(child_tp.span_id(), span.span_id());
    assert!(child_tp.sampled());

    let parent: Traceparent = PARENT.parse().unwrap();
    assert_eq!(span.trace_id(), parent.trace_id());
    assert_eq!(span.parent_span_id(), Some(parent.span_id()));
}

#[tokio::test]
async fn non_recording_passes_inherited_context_through() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let seen = tmp.path().join("seen");
    let config = ConfigBuilder::new().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        otel_exec::exec::CommandDescriptor::from_argv(dump_traceparent(&seen)).unwrap(),
        &env_with_parent(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 0);
    assert_eq!(fs::read_to_string(&seen).unwrap(), PARENT);
    // Non-recording runs still export through whatever exporter they are given,
    // but the span carries no link to the inherited context.
    assert_eq!(run.report.span.parent_span_id(), None);
}

#[tokio::test]
async fn ignore_env_strips_traceparent_from_the_child() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let seen = tmp.path().join("seen");
    let config = ConfigBuilder::new().tp_ignore_env().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        otel_exec::exec::CommandDescriptor::from_argv(dump_traceparent(&seen)).unwrap(),
        &env_with_parent(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert_eq!(run.report.exit_code, 0);
    assert_eq!(fs::read_to_string(&seen).unwrap(), "");
    assert!(run.report.child_context.is_none());
}

#[tokio::test]
async fn recording_ignores_env_parent_when_asked() {
    init_tracing();
    let config = ConfigBuilder::new().recording().tp_ignore_env().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["true"]),
        &env_with_parent(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    let parent: Traceparent = PARENT.parse().unwrap();
    assert_ne!(run.report.span.trace_id(), parent.trace_id());
    assert_eq!(run.report.span.parent_span_id(), None);
}

#[tokio::test]
async fn carrier_file_is_read_then_rewritten_with_the_child_context() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let carrier = tmp.path().join("nested").join("traceparent");
    fs::create_dir_all(carrier.parent().unwrap()).unwrap();
    fs::write(&carrier, format!("# inherited\nexport TRACEPARENT={PARENT}\n")).unwrap();

    let config = ConfigBuilder::new().recording().tp_carrier(&carrier).build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["true"]),
        &clean_env(),
        &RealFileSystem,
        &mut exporter,
    ))
    .await;

    let parent: Traceparent = PARENT.parse().unwrap();
    assert_eq!(run.report.span.trace_id(), parent.trace_id());

    let written = fs::read_to_string(&carrier).unwrap();
    let child = run.report.child_context.expect("recording run propagates");
    assert!(written.contains(&format!("TRACEPARENT={child}\n")));
    assert!(written.starts_with(&format!("# trace id: {}\n", child.trace_id_hex())));
}

#[tokio::test]
async fn env_traceparent_overrides_the_carrier_file() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(
        "/carrier",
        "TRACEPARENT=00-11111111111111111111111111111111-2222222222222222-01\n",
    );
    let config = ConfigBuilder::new().recording().tp_carrier("/carrier").build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["true"]),
        &env_with_parent(),
        &fs,
        &mut exporter,
    ))
    .await;

    let parent: Traceparent = PARENT.parse().unwrap();
    assert_eq!(run.report.span.trace_id(), parent.trace_id());
}

#[tokio::test]
async fn print_writes_the_child_context_to_stdout() {
    init_tracing();
    let config = ConfigBuilder::new().recording().tp_print().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["true"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    let child = run.report.child_context.unwrap();
    assert_eq!(run.stdout, format!("TRACEPARENT={child}\n"));
}

#[tokio::test]
async fn nothing_is_printed_without_a_context() {
    init_tracing();
    let config = ConfigBuilder::new().tp_print().build();
    let mut exporter = FakeExporter::accepting();

    let run = with_timeout(run(
        &config,
        argv(&["true"]),
        &clean_env(),
        &MockFileSystem::new(),
        &mut exporter,
    ))
    .await;

    assert!(run.stdout.is_empty());
}
