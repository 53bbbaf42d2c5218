use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::info;

use crate::{
    consumer::{consume, ConsumeReport, MessageLog},
    ports::SessionPort,
    shutdown::{watch, ShutdownSignal, Terminator},
};

/// Run the update loop until the session closes its stream.
///
/// The shutdown watcher runs as its own task next to the consumer. When a
/// signal arrives it stops the session and ends the process; the consumer is
/// not drained. If the stream closes on its own, the watcher is cancelled.
/// If it closed because the watcher is stopping the session, the watcher is
/// awaited so the stop and the exit both happen.
pub async fn run<S, T>(
    session: Arc<dyn SessionPort>,
    signals: S,
    terminator: T,
    log: &dyn MessageLog,
) -> ConsumeReport
where
    S: ShutdownSignal + 'static,
    T: Terminator + 'static,
{
    let (stopping, mut stopping_rx) = oneshot::channel();
    let watcher = tokio::spawn(watch(signals, session.clone(), terminator, stopping));

    info!("listening for new messages");
    let report = consume(session.listen(), log).await;

    match stopping_rx.try_recv() {
        Ok(signal) => {
            info!(?signal, "update stream closed by shutdown");
            let _ = watcher.await;
        }
        Err(_) => watcher.abort(),
    }
    report
}
