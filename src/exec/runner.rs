// src/exec/runner.rs

//! Spawning and waiting on the wrapped command.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::trace::SpanRecord;

use super::command::CommandDescriptor;
use super::deadline::Deadline;
use super::env::ProcessEnv;
use super::signals::ChildPid;

/// Exit code used when the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code used when the program exists but could not be started.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;

/// Why the command did not succeed.
#[derive(Debug, Error)]
pub enum ExecFailure {
    #[error("spawning {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("exit status {0}")]
    ExitStatus(i32),

    #[error("terminated by signal {0}")]
    Signaled(i32),

    #[error("command deadline of {limit:?} exceeded; child killed")]
    DeadlineExceeded {
        limit: Duration,
        status: Option<ExitStatus>,
    },

    #[error("waiting for child: {0}")]
    Wait(io::Error),
}

impl ExecFailure {
    /// Exit code the wrapper should report for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecFailure::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                EXIT_NOT_FOUND
            }
            ExecFailure::Spawn { .. } => EXIT_CANNOT_EXECUTE,
            ExecFailure::ExitStatus(code) => *code,
            ExecFailure::Signaled(sig) => 128 + sig,
            ExecFailure::DeadlineExceeded { status, .. } => status
                .map(exit_code_from_status)
                .unwrap_or(128 + SIGKILL),
            ExecFailure::Wait(_) => 1,
        }
    }
}

#[cfg(unix)]
const SIGKILL: i32 = libc::SIGKILL;
#[cfg(not(unix))]
const SIGKILL: i32 = 9;

/// Result of running the child.
#[derive(Debug)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub pid: Option<u32>,
    pub failure: Option<ExecFailure>,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Map a wait status to a shell-style exit code: the code itself, or
/// `128 + signal` when the child was killed by a signal.
pub fn exit_code_from_status(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    1
}

fn failure_from_status(status: ExitStatus) -> ExecFailure {
    if let Some(code) = status.code() {
        return ExecFailure::ExitStatus(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return ExecFailure::Signaled(sig);
        }
    }
    ExecFailure::ExitStatus(1)
}

/// Run `command` to completion inside `deadline`.
///
/// Stdio is inherited from the wrapper. The span's end time is stamped as
/// soon as the wait returns, before anything else; failures then mark the
/// span as an error.
pub async fn execute(
    command: &CommandDescriptor,
    env: &ProcessEnv,
    deadline: &Deadline,
    child_pid: &ChildPid,
    span: &mut SpanRecord,
) -> ExecOutcome {
    let mut cmd = Command::new(command.program());
    cmd.args(command.args())
        .env_clear()
        .envs(env.iter())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let result = run_child(&mut cmd, command, deadline, child_pid).await;
    span.end();
    child_pid.mark_exited();

    let (exit_code, failure) = match result {
        Ok(status) if status.success() => (0, None),
        Ok(status) => {
            let failure = failure_from_status(status);
            (failure.exit_code(), Some(failure))
        }
        Err(failure) => (failure.exit_code(), Some(failure)),
    };

    match &failure {
        None => info!(program = %command.program(), exit_code, "command exited"),
        Some(err) => {
            info!(program = %command.program(), exit_code, error = %err, "command failed");
            span.fail(format!("exec command failed: {err}"));
        }
    }

    ExecOutcome {
        exit_code,
        pid: child_pid.get(),
        failure,
    }
}

async fn run_child(
    cmd: &mut Command,
    command: &CommandDescriptor,
    deadline: &Deadline,
    child_pid: &ChildPid,
) -> Result<ExitStatus, ExecFailure> {
    let mut child = cmd.spawn().map_err(|source| ExecFailure::Spawn {
        program: command.program().to_string(),
        source,
    })?;

    if let Some(pid) = child.id() {
        child_pid.set(pid);
        debug!(pid, program = %command.program(), "child spawned");
    }

    let waited = deadline.bound(child.wait()).await;
    match waited {
        Ok(status) => status.map_err(ExecFailure::Wait),
        Err(exceeded) => {
            warn!(error = %exceeded, "killing child");
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill child after deadline");
            }
            let status = child.try_wait().ok().flatten();
            Err(ExecFailure::DeadlineExceeded {
                limit: exceeded.limit,
                status,
            })
        }
    }
}
