use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    config::TdlibParameters,
    updates::{OptionValue, Update, User},
    Result,
};

/// Hexagonal port for a live session against the messaging backend.
///
/// TDLib is the production implementation (`tgtail-tdjson`); tests drive the
/// orchestration code with scripted fakes. After `stop` every other call
/// fails with `Error::Closed`.
#[async_trait]
pub trait SessionPort: Send + Sync {
    /// Set the verbosity of the backend's internal log. Called once, before `start`.
    async fn set_log_verbosity(&self, level: i32) -> Result<()>;

    /// Bring the session up; returns once the account is authorized.
    async fn start(&self, params: &TdlibParameters) -> Result<()>;

    async fn get_option(&self, name: &str) -> Result<OptionValue>;

    async fn get_me(&self) -> Result<User>;

    /// Subscribe to the update stream from this point on.
    fn listen(&self) -> Listener;

    /// Close the session and release backend resources.
    async fn stop(&self) -> Result<()>;
}

/// Scoped subscription to a session's update stream.
///
/// The release hook runs exactly once, when the listener is dropped.
pub struct Listener {
    rx: mpsc::UnboundedReceiver<Update>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Listener {
    pub fn new(
        rx: mpsc::UnboundedReceiver<Update>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            release: Some(Box::new(release)),
        }
    }

    /// Next update in delivery order; `None` once the session closed the channel.
    pub async fn recv(&mut self) -> Option<Update> {
        self.rx.recv().await
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("released", &self.release.is_none())
            .finish()
    }
}
