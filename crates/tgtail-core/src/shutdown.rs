use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::{ports::SessionPort, Result};

/// Exit status after a signal-triggered stop. Same as a fatal startup error.
pub const SHUTDOWN_EXIT_CODE: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

/// Subscription to process termination requests.
///
/// Created once at startup, before the update loop begins.
#[async_trait]
pub trait ShutdownSignal: Send {
    /// Wait for the next signal; `None` when no more can arrive.
    async fn recv(&mut self) -> Option<Signal>;
}

/// Ends the process.
pub trait Terminator: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Production terminator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

/// SIGINT / SIGTERM (Ctrl-C only on non-unix targets).
pub struct OsSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl OsSignals {
    /// Register the handlers now, so signals delivered before the first `recv`
    /// are not lost.
    pub fn subscribe() -> Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }
}

#[async_trait]
impl ShutdownSignal for OsSignals {
    async fn recv(&mut self) -> Option<Signal> {
        #[cfg(unix)]
        {
            tokio::select! {
                s = self.interrupt.recv() => s.map(|_| Signal::Interrupt),
                s = self.terminate.recv() => s.map(|_| Signal::Terminate),
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok().map(|_| Signal::Interrupt)
        }
    }
}

/// In-process signal source, for embedding and tests.
pub struct ChannelSignals {
    rx: mpsc::UnboundedReceiver<Signal>,
}

impl ChannelSignals {
    pub fn new() -> (mpsc::UnboundedSender<Signal>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl ShutdownSignal for ChannelSignals {
    async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }
}

/// Wait for the first termination signal, stop the session once, then end
/// the process.
///
/// `stopping` receives the signal before `stop` is issued. Stopping closes the
/// session's streams, so a caller that sees its stream end can check
/// `stopping` to tell whether a shutdown is underway and must be awaited.
///
/// Later signals are never read. Returns the signal that triggered the stop,
/// or `None` if the subscription ended first.
pub async fn watch<S, T>(
    mut signals: S,
    session: Arc<dyn SessionPort>,
    terminator: T,
    stopping: oneshot::Sender<Signal>,
) -> Option<Signal>
where
    S: ShutdownSignal,
    T: Terminator,
{
    let Some(signal) = signals.recv().await else {
        warn!("signal subscription closed; shutdown watcher exiting");
        return None;
    };

    info!(?signal, "termination requested, stopping session");
    let _ = stopping.send(signal);
    if let Err(e) = session.stop().await {
        error!("failed to stop session cleanly: {e}");
    }

    terminator.terminate(SHUTDOWN_EXIT_CODE);
    Some(signal)
}
