// src/export/mod.rs

//! Span egress.
//!
//! The engine talks to a [`SpanExporter`] rather than to an HTTP client
//! directly. This makes it easy to swap in fakes in tests while keeping the
//! production OTLP exporter in [`otlp`].
//!
//! Export failures are soft: [`export_span`] logs them and reports them in
//! an [`ExportReport`], but never turns them into an error for the caller.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::exec::{Deadline, DeadlineExceeded};
use crate::trace::SpanRecord;

pub mod null;
pub mod otlp;

pub use null::NullExporter;
pub use otlp::OtlpHttpExporter;

pub type ExportFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("collector responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("encoding span: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),

    #[error("{0}")]
    Other(String),
}

impl ExportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            ExportError::Deadline(_) => true,
            ExportError::Transport(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Trait abstracting where finished spans go.
///
/// Production code uses [`OtlpHttpExporter`] or [`NullExporter`]; tests can
/// provide their own implementation that records or fails.
pub trait SpanExporter: Send {
    /// Transmit one finished span.
    fn send<'a>(&'a mut self, span: &'a SpanRecord) -> ExportFuture<'a>;

    /// Flush and release the client.
    fn shutdown(&mut self) -> ExportFuture<'_>;
}

impl<E: SpanExporter + ?Sized> SpanExporter for Box<E> {
    fn send<'a>(&'a mut self, span: &'a SpanRecord) -> ExportFuture<'a> {
        (**self).send(span)
    }

    fn shutdown(&mut self) -> ExportFuture<'_> {
        (**self).shutdown()
    }
}

/// Pick the exporter for this invocation.
pub fn exporter_from_config(config: &Config) -> Result<Box<dyn SpanExporter>, ExportError> {
    match config.endpoint.as_deref() {
        Some(endpoint) => Ok(Box::new(OtlpHttpExporter::new(
            endpoint,
            config.headers.clone(),
            config.service_name.clone(),
        )?)),
        None => Ok(Box::new(NullExporter)),
    }
}

/// Outcome of both export steps.
#[derive(Debug)]
pub struct ExportReport {
    pub send: Result<(), ExportError>,
    pub shutdown: Result<(), ExportError>,
}

impl ExportReport {
    pub fn is_clean(&self) -> bool {
        self.send.is_ok() && self.shutdown.is_ok()
    }
}

/// Send `span` and shut the exporter down, both inside `window`.
pub async fn export_span<E: SpanExporter + ?Sized>(
    exporter: &mut E,
    span: &SpanRecord,
    window: &Deadline,
) -> ExportReport {
    let send = flatten(window.bound(exporter.send(span)).await);
    match &send {
        Ok(()) => debug!("span sent"),
        Err(err) => warn!(error = %err, timeout = err.is_timeout(), "unable to send span"),
    }

    let shutdown = flatten(window.bound(exporter.shutdown()).await);
    if let Err(err) = &shutdown {
        warn!(error = %err, "exporter shutdown failed");
    }

    ExportReport { send, shutdown }
}

fn flatten(
    result: Result<Result<(), ExportError>, DeadlineExceeded>,
) -> Result<(), ExportError> {
    result.map_err(ExportError::from).and_then(|inner| inner)
}
