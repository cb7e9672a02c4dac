// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] describes the wrapped command and its span attributes.
//! - [`env`] composes the child's environment.
//! - [`deadline`] owns the command and export time windows.
//! - [`signals`] relays SIGINT/SIGTERM from the wrapper to the child.
//! - [`runner`] spawns the child and waits for it with `tokio::process`.

pub mod command;
pub mod deadline;
pub mod env;
pub mod runner;
pub mod signals;

pub use command::{ATTR_ARGUMENTS, ATTR_COMMAND, CommandDescriptor, csv_join};
pub use deadline::{Deadline, DeadlineCoordinator, DeadlineExceeded, TimeoutPair, Window};
pub use env::{ProcessEnv, build_child_env};
pub use runner::{ExecFailure, ExecOutcome, execute, exit_code_from_status};
pub use signals::{
    ChildPid, OsSignalSource, RelayReport, RelaySignal, RelayState, SignalRelay, SignalSource,
};
