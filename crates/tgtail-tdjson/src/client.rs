use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tgtail_core::{
    config::TdlibParameters,
    errors::Error,
    ports::{Listener, SessionPort},
    updates::{OptionValue, Update, User},
    Result,
};

use crate::backend::TdBackend;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Listener registry shared with the fan-out task.
#[derive(Default)]
struct Shared {
    next_listener: AtomicU64,
    listeners: Mutex<HashMap<u64, mpsc::UnboundedSender<Update>>>,
    closed: AtomicBool,
}

impl Shared {
    fn publish(&self, update: Update) {
        lock(&self.listeners).retain(|_, tx| tx.send(update.clone()).is_ok());
    }

    /// Mark the session closed and end every listener's stream.
    fn shut_down(&self) {
        self.closed.store(true, Ordering::SeqCst);
        lock(&self.listeners).clear();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

async fn fan_out(
    shared: Arc<Shared>,
    mut updates: mpsc::UnboundedReceiver<Update>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            update = updates.recv() => match update {
                Some(update) => shared.publish(update),
                None => break,
            },
        }
    }
    shared.shut_down();
    debug!("tdlib update stream ended");
}

/// TDLib session over a `TdBackend`.
///
/// A fan-out task copies every decoded update to the live listeners. The
/// session closes when `stop` is called or when the backend ends its update
/// stream; after that every call fails with `Error::Closed` and new
/// listeners get an already-ended stream.
pub struct TdClient<B: TdBackend> {
    backend: B,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    started: AtomicBool,
    stop_requested: AtomicBool,
}

impl<B: TdBackend> TdClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            shared: Arc::new(Shared::default()),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.is_closed() || self.stop_requested.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    #[cfg(test)]
    fn listener_count(&self) -> usize {
        lock(&self.shared.listeners).len()
    }
}

impl<B: TdBackend> Drop for TdClient<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl<B: TdBackend> SessionPort for TdClient<B> {
    async fn set_log_verbosity(&self, level: i32) -> Result<()> {
        self.ensure_open()?;
        self.backend.set_log_verbosity(level)
    }

    async fn start(&self, params: &TdlibParameters) -> Result<()> {
        self.ensure_open()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::External("session already started".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(fan_out(self.shared.clone(), rx, self.cancel.clone()));

        self.backend.connect(params, tx).await?;
        info!("authorized");
        Ok(())
    }

    async fn get_option(&self, name: &str) -> Result<OptionValue> {
        self.ensure_open()?;
        self.backend.get_option(name).await
    }

    async fn get_me(&self) -> Result<User> {
        self.ensure_open()?;
        self.backend.get_me().await
    }

    fn listen(&self) -> Listener {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.shared.next_listener.fetch_add(1, Ordering::SeqCst);
        lock(&self.shared.listeners).insert(id, tx);
        // The fan-out task may have shut down between registration and here.
        if self.shared.is_closed() {
            lock(&self.shared.listeners).remove(&id);
        }

        let shared = Arc::downgrade(&self.shared);
        Listener::new(rx, move || {
            if let Some(shared) = shared.upgrade() {
                lock(&shared.listeners).remove(&id);
            }
        })
    }

    async fn stop(&self) -> Result<()> {
        if self.stop_requested.swap(true, Ordering::SeqCst) || self.shared.is_closed() {
            return Ok(());
        }

        let closed = self.backend.close().await;
        self.shared.shut_down();
        self.cancel.cancel();
        closed?;

        info!("session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tgtail_core::{
        domain::{ChatId, UserId},
        updates::ChatAction,
    };

    use super::*;

    /// Scripted binding: records calls and lets the test drive the stream.
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        updates: Mutex<Option<mpsc::UnboundedSender<Update>>>,
        fail_close: bool,
    }

    impl FakeBackend {
        fn failing_close() -> Self {
            Self {
                fail_close: true,
                ..Self::default()
            }
        }

        fn record(&self, call: &str) {
            lock(&self.calls).push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            lock(&self.calls).clone()
        }

        fn push(&self, update: Update) {
            if let Some(tx) = lock(&self.updates).as_ref() {
                tx.send(update).unwrap();
            }
        }

        fn end_stream(&self) {
            lock(&self.updates).take();
        }
    }

    #[async_trait]
    impl TdBackend for FakeBackend {
        fn set_log_verbosity(&self, level: i32) -> Result<()> {
            self.record(&format!("verbosity:{level}"));
            Ok(())
        }

        async fn connect(
            &self,
            _params: &TdlibParameters,
            updates: mpsc::UnboundedSender<Update>,
        ) -> Result<()> {
            self.record("connect");
            *lock(&self.updates) = Some(updates);
            Ok(())
        }

        async fn get_option(&self, name: &str) -> Result<OptionValue> {
            self.record(&format!("get_option:{name}"));
            Ok(OptionValue::String {
                value: "1.8.0".to_string(),
            })
        }

        async fn get_me(&self) -> Result<User> {
            self.record("get_me");
            Ok(User {
                id: UserId(7),
                first_name: "Ada".to_string(),
                last_name: String::new(),
                username: "ada".to_string(),
            })
        }

        async fn close(&self) -> Result<()> {
            self.record("close");
            self.end_stream();
            tokio::task::yield_now().await;
            if self.fail_close {
                return Err(Error::Td("close rejected".to_string()));
            }
            Ok(())
        }
    }

    fn params() -> TdlibParameters {
        TdlibParameters::new(1, "h".to_string(), std::path::Path::new(".tdlib"))
    }

    fn typing(chat: i64) -> Update {
        Update::ChatAction {
            chat_id: ChatId(chat),
            action: ChatAction::Typing,
        }
    }

    async fn within<F: std::future::Future>(f: F) -> F::Output {
        tokio::time::timeout(Duration::from_secs(2), f)
            .await
            .expect("timed out")
    }

    #[tokio::test]
    async fn calls_pass_through_to_the_backend() {
        let client = TdClient::new(FakeBackend::default());

        client.set_log_verbosity(1).await.unwrap();
        client.start(&params()).await.unwrap();
        let version = client.get_option("version").await.unwrap();
        let me = client.get_me().await.unwrap();

        assert_eq!(
            version,
            OptionValue::String {
                value: "1.8.0".to_string()
            }
        );
        assert_eq!(me.handle(), "ada");
        assert_eq!(
            client.backend.calls(),
            vec!["verbosity:1", "connect", "get_option:version", "get_me"]
        );

        let err = client.start(&params()).await.unwrap_err();
        assert!(matches!(err, Error::External(_)));
    }

    #[tokio::test]
    async fn updates_reach_live_listeners_only() {
        let client = TdClient::new(FakeBackend::default());
        client.start(&params()).await.unwrap();

        let mut first = client.listen();
        let second = client.listen();
        assert_eq!(client.listener_count(), 2);

        client.backend.push(typing(1));
        assert_eq!(within(first.recv()).await, Some(typing(1)));

        drop(second);
        assert_eq!(client.listener_count(), 1);

        client.backend.push(typing(2));
        assert_eq!(within(first.recv()).await, Some(typing(2)));
    }

    #[tokio::test]
    async fn stop_closes_streams_once_and_fails_later_calls() {
        let client = TdClient::new(FakeBackend::default());
        client.start(&params()).await.unwrap();
        let mut listener = client.listen();

        client.stop().await.unwrap();
        client.stop().await.unwrap();

        assert_eq!(
            client.backend.calls().iter().filter(|c| *c == "close").count(),
            1
        );
        assert_eq!(within(listener.recv()).await, None);
        assert!(matches!(client.get_me().await, Err(Error::Closed)));
        assert!(matches!(
            client.get_option("version").await,
            Err(Error::Closed)
        ));

        let mut late = client.listen();
        assert_eq!(within(late.recv()).await, None);
        assert_eq!(client.listener_count(), 0);
    }

    #[tokio::test]
    async fn failed_close_still_ends_streams() {
        let client = TdClient::new(FakeBackend::failing_close());
        client.start(&params()).await.unwrap();
        let mut listener = client.listen();

        let err = client.stop().await.unwrap_err();

        assert!(matches!(err, Error::Td(_)));
        assert_eq!(within(listener.recv()).await, None);
        assert!(matches!(client.get_me().await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn backend_ending_the_stream_closes_the_session() {
        let client = TdClient::new(FakeBackend::default());
        client.start(&params()).await.unwrap();
        let mut listener = client.listen();

        client.backend.end_stream();

        assert_eq!(within(listener.recv()).await, None);
        assert!(matches!(client.get_me().await, Err(Error::Closed)));
        // Nothing left to close.
        client.stop().await.unwrap();
        assert!(!client.backend.calls().contains(&"close".to_string()));
    }
}
