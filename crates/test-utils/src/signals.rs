use std::time::Duration;

use otel_exec::exec::RelaySignal;
use tokio::sync::mpsc;

/// A signal source that delivers `signal` once, `after` from now.
///
/// Must be called from inside a tokio runtime.
pub fn deliver_after(after: Duration, signal: RelaySignal) -> mpsc::Receiver<RelaySignal> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = tx.send(signal).await;
    });
    rx
}

/// A signal source that never delivers anything.
///
/// The sender is leaked into a parked task so the channel stays open.
pub fn silent() -> mpsc::Receiver<RelaySignal> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let _tx = tx;
        std::future::pending::<()>().await;
    });
    rx
}
