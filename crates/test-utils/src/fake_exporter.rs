use std::sync::{Arc, Mutex};
use std::time::Duration;

use otel_exec::export::{ExportError, ExportFuture, SpanExporter};
use otel_exec::trace::SpanRecord;

/// What a [`FakeExporter`] does when asked to send.
#[derive(Debug, Clone, Copy)]
pub enum SendBehaviour {
    /// Record the span and succeed.
    Accept,
    /// Fail immediately with an `ExportError::Other`.
    Fail,
    /// Sleep this long before recording the span.
    Stall(Duration),
}

/// A fake exporter that:
/// - records every span it was asked to send
/// - counts shutdown calls
/// - can be told to fail or stall.
#[derive(Debug, Clone)]
pub struct FakeExporter {
    behaviour: SendBehaviour,
    sent: Arc<Mutex<Vec<SpanRecord>>>,
    shutdowns: Arc<Mutex<usize>>,
    fail_shutdown: bool,
}

impl FakeExporter {
    pub fn new(behaviour: SendBehaviour) -> Self {
        Self {
            behaviour,
            sent: Arc::new(Mutex::new(Vec::new())),
            shutdowns: Arc::new(Mutex::new(0)),
            fail_shutdown: false,
        }
    }

    pub fn accepting() -> Self {
        Self::new(SendBehaviour::Accept)
    }

    pub fn failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    pub fn sent(&self) -> Vec<SpanRecord> {
        self.sent.lock().unwrap().clone()
    }

    pub fn shutdown_calls(&self) -> usize {
        *self.shutdowns.lock().unwrap()
    }
}

impl SpanExporter for FakeExporter {
    fn send<'a>(&'a mut self, span: &'a SpanRecord) -> ExportFuture<'a> {
        let behaviour = self.behaviour;
        let sent = Arc::clone(&self.sent);

        Box::pin(async move {
            match behaviour {
                SendBehaviour::Accept => {}
                SendBehaviour::Fail => {
                    return Err(ExportError::Other("collector unavailable".to_string()));
                }
                SendBehaviour::Stall(delay) => tokio::time::sleep(delay).await,
            }
            sent.lock().unwrap().push(span.clone());
            Ok(())
        })
    }

    fn shutdown(&mut self) -> ExportFuture<'_> {
        let shutdowns = Arc::clone(&self.shutdowns);
        let fail = self.fail_shutdown;

        Box::pin(async move {
            *shutdowns.lock().unwrap() += 1;
            if fail {
                Err(ExportError::Other("flush failed".to_string()))
            } else {
                Ok(())
            }
        })
    }
}
