// src/exec/signals.rs

//! Relaying termination signals from the wrapper to the child.
//!
//! The relay is registered before the child is spawned so nothing delivered
//! in between is lost to the default handler. It forwards at most one
//! signal, then stops. The main flow calls [`SignalRelay::stop`] after the
//! child has exited and waits for the relay to confirm it is done, so a
//! signal racing the child's exit is still forwarded before the wrapper
//! moves on to export.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Signals the relay knows how to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaySignal {
    Interrupt,
    Terminate,
}

impl RelaySignal {
    #[cfg(unix)]
    pub fn as_raw(self) -> libc::c_int {
        match self {
            RelaySignal::Interrupt => libc::SIGINT,
            RelaySignal::Terminate => libc::SIGTERM,
        }
    }
}

/// Where incoming signals come from.
///
/// Production uses [`OsSignalSource`]; tests drive the relay through an
/// `mpsc::Receiver<RelaySignal>`. `None` means the source is closed.
pub trait SignalSource: Send + 'static {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<RelaySignal>> + Send + '_>>;
}

impl SignalSource for mpsc::Receiver<RelaySignal> {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<RelaySignal>> + Send + '_>> {
        Box::pin(mpsc::Receiver::recv(self))
    }
}

/// SIGINT / SIGTERM delivered to this process.
#[derive(Debug)]
pub struct OsSignalSource {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl OsSignalSource {
    /// Install the handlers. From here on the signals no longer terminate
    /// the wrapper.
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> io::Result<Self> {
        Ok(Self {})
    }
}

impl SignalSource for OsSignalSource {
    #[cfg(unix)]
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<RelaySignal>> + Send + '_>> {
        Box::pin(async move {
            tokio::select! {
                s = self.interrupt.recv() => s.map(|_| RelaySignal::Interrupt),
                s = self.terminate.recv() => s.map(|_| RelaySignal::Terminate),
            }
        })
    }

    #[cfg(not(unix))]
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<RelaySignal>> + Send + '_>> {
        Box::pin(async move {
            tokio::signal::ctrl_c()
                .await
                .ok()
                .map(|_| RelaySignal::Interrupt)
        })
    }
}

/// Pid of the child, written once at spawn and read by the relay.
///
/// Once the child has been waited on its pid may be reused by an unrelated
/// process, so the runner marks it exited and the relay stops signalling it.
/// Marking and signalling take the same lock, so a forward that is already
/// under way finishes before the pid is retired.
#[derive(Debug, Clone, Default)]
pub struct ChildPid(Arc<ChildSlot>);

#[derive(Debug, Default)]
struct ChildSlot {
    pid: OnceLock<u32>,
    exited: Mutex<bool>,
}

impl ChildPid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pid. Returns false if one was already set.
    pub fn set(&self, pid: u32) -> bool {
        self.0.pid.set(pid).is_ok()
    }

    pub fn get(&self) -> Option<u32> {
        self.0.pid.get().copied()
    }

    /// The child has been reaped; its pid must no longer be signalled.
    pub fn mark_exited(&self) {
        *self.exited_flag() = true;
    }

    pub fn is_exited(&self) -> bool {
        *self.exited_flag()
    }

    /// Run `f` with the pid while the child is known to be alive.
    ///
    /// Returns `None` before spawn and after [`ChildPid::mark_exited`].
    pub fn with_live<R>(&self, f: impl FnOnce(u32) -> R) -> Option<R> {
        let exited = self.exited_flag();
        if *exited {
            return None;
        }
        self.get().map(f)
    }

    fn exited_flag(&self) -> MutexGuard<'_, bool> {
        self.0
            .exited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Listening,
    Forwarded(RelaySignal),
    Stopped,
}

/// What the relay did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayReport {
    pub received: Option<RelaySignal>,
    /// The signal was actually delivered to the child.
    pub delivered: bool,
}

/// Handle to the background relay task.
#[derive(Debug)]
pub struct SignalRelay {
    state_rx: watch::Receiver<RelayState>,
    stop_tx: Option<oneshot::Sender<()>>,
    done_rx: oneshot::Receiver<RelayReport>,
}

impl SignalRelay {
    /// Start listening on `source`, forwarding to whatever pid `child` holds
    /// when a signal arrives.
    pub fn start<S: SignalSource>(source: S, child: ChildPid) -> Self {
        let (state_tx, state_rx) = watch::channel(RelayState::Idle);
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        state_tx.send_replace(RelayState::Listening);
        tokio::spawn(relay_loop(source, child, stop_rx, state_tx, done_tx));

        Self {
            state_rx,
            stop_tx: Some(stop_tx),
            done_rx,
        }
    }

    pub fn state(&self) -> RelayState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RelayState> {
        self.state_rx.clone()
    }

    /// Ask the relay to stop listening and wait until it has.
    ///
    /// If a signal is already being forwarded, this waits for that to
    /// finish first.
    pub async fn stop(mut self) -> RelayReport {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The relay may already have stopped on its own.
            let _ = stop_tx.send(());
        }
        match self.done_rx.await {
            Ok(report) => report,
            Err(_) => {
                warn!("signal relay exited without reporting");
                RelayReport::default()
            }
        }
    }
}

async fn relay_loop<S: SignalSource>(
    mut source: S,
    child: ChildPid,
    mut stop_rx: oneshot::Receiver<()>,
    state_tx: watch::Sender<RelayState>,
    done_tx: oneshot::Sender<RelayReport>,
) {
    let received = tokio::select! {
        biased;
        sig = source.recv() => sig,
        _ = &mut stop_rx => None,
    };

    let mut report = RelayReport {
        received,
        delivered: false,
    };

    if let Some(signal) = received {
        report.delivered = match child.with_live(|pid| (pid, forward_signal(pid, signal))) {
            Some((pid, Ok(()))) => {
                info!(pid, ?signal, "forwarded signal to child");
                true
            }
            Some((pid, Err(err))) => {
                debug!(pid, ?signal, error = %err, "could not forward signal; child likely gone");
                false
            }
            None if child.is_exited() => {
                debug!(?signal, "child already exited; signal not forwarded");
                false
            }
            None => {
                debug!(?signal, "signal arrived before the child was spawned; not forwarded");
                false
            }
        };
        state_tx.send_replace(RelayState::Forwarded(signal));
    }

    state_tx.send_replace(RelayState::Stopped);
    let _ = done_tx.send(report);
}

#[cfg(unix)]
fn forward_signal(pid: u32, signal: RelaySignal) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill(2) takes plain integers and has no memory-safety requirements.
    let rc = unsafe { libc::kill(pid, signal.as_raw()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn forward_signal(_pid: u32, _signal: RelaySignal) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "signal forwarding is only supported on unix",
    ))
}
