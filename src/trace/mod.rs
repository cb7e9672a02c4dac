// src/trace/mod.rs

//! Trace data: the traceparent carrier, the span record, id generation and
//! context propagation.

pub mod ids;
pub mod propagation;
pub mod span;
pub mod traceparent;

pub use propagation::{load_inherited, propagate, select_child_context};
pub use span::{SpanRecord, Timestamp};
pub use traceparent::{TRACEPARENT_ENV, Traceparent, TraceparentError};
