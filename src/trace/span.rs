// src/trace/span.rs

//! In-memory record of the single span produced per invocation.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

use crate::types::{SpanKind, StatusCode};

use super::ids::{new_span_id, new_trace_id};
use super::traceparent::Traceparent;

/// A point in time captured on both clocks: wall time for export, monotonic
/// time for measuring duration.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    wall: SystemTime,
    mono: Instant,
}

impl Timestamp {
    pub fn now() -> Self {
        Self {
            wall: SystemTime::now(),
            mono: Instant::now(),
        }
    }

    pub fn unix_nanos(&self) -> u64 {
        self.wall
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }

    pub fn wall(&self) -> SystemTime {
        self.wall
    }

    pub fn monotonic(&self) -> Instant {
        self.mono
    }
}

#[derive(Debug, Clone)]
pub struct SpanRecord {
    trace_id: [u8; 16],
    span_id: [u8; 8],
    parent_span_id: Option<[u8; 8]>,
    name: String,
    kind: SpanKind,
    start: Timestamp,
    end: Option<Timestamp>,
    status: StatusCode,
    status_message: String,
    attributes: BTreeMap<String, String>,
}

impl SpanRecord {
    /// Start a new span now.
    ///
    /// An initialized `parent` puts the span in the parent's trace; otherwise a
    /// fresh trace id is drawn.
    pub fn start(
        name: impl Into<String>,
        kind: SpanKind,
        parent: &Traceparent,
        attributes: BTreeMap<String, String>,
    ) -> Self {
        let (trace_id, parent_span_id) = if parent.is_initialized() {
            (parent.trace_id(), Some(parent.span_id()))
        } else {
            (new_trace_id(), None)
        };

        Self {
            trace_id,
            span_id: new_span_id(),
            parent_span_id,
            name: name.into(),
            kind,
            start: Timestamp::now(),
            end: None,
            status: StatusCode::Unset,
            status_message: String::new(),
            attributes,
        }
    }

    /// Mark the span as failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = StatusCode::Error;
        self.status_message = message.into();
    }

    /// Stamp the end time. Only the first call counts.
    pub fn end(&mut self) {
        if self.end.is_none() {
            self.end = Some(Timestamp::now());
        }
    }

    pub fn is_ended(&self) -> bool {
        self.end.is_some()
    }

    /// `end - start` on the monotonic clock, once ended.
    pub fn duration(&self) -> Option<Duration> {
        self.end
            .map(|end| end.mono.saturating_duration_since(self.start.mono))
    }

    /// Carrier pointing at this span, for handing to a child process.
    pub fn traceparent(&self, sampled: bool) -> Traceparent {
        Traceparent::new(self.trace_id, self.span_id, sampled)
    }

    pub fn trace_id(&self) -> [u8; 16] {
        self.trace_id
    }

    pub fn span_id(&self) -> [u8; 8] {
        self.span_id
    }

    pub fn parent_span_id(&self) -> Option<[u8; 8]> {
        self.parent_span_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SpanKind {
        self.kind
    }

    pub fn start_time(&self) -> Timestamp {
        self.start
    }

    pub fn end_time(&self) -> Option<Timestamp> {
        self.end
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
