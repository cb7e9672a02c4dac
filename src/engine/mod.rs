// src/engine/mod.rs

//! The traced-exec flow.
//!
//! [`runtime::run_traced`] composes the trace, exec and export layers into
//! one invocation: span creation, child environment, signal relay, the
//! command and export windows, and context propagation.

pub mod runtime;

pub use runtime::{ExecReport, Invocation, run_traced};
