use async_trait::async_trait;
use tokio::sync::mpsc;

use tgtail_core::{
    config::TdlibParameters,
    updates::{OptionValue, Update, User},
    Result,
};

/// The calls `TdClient` needs from a TDLib binding.
///
/// The binding owns authorization and decoding. `TdClient` adds listener
/// fan-out and the stop-once lifecycle on top.
#[async_trait]
pub trait TdBackend: Send + Sync + 'static {
    /// Set TDLib's internal log verbosity. Needs no session.
    fn set_log_verbosity(&self, level: i32) -> Result<()>;

    /// Authorize with `params`; returns once the account is ready.
    ///
    /// Decoded updates go to `updates` from now until the session ends.
    /// Dropping the sender ends the stream.
    async fn connect(
        &self,
        params: &TdlibParameters,
        updates: mpsc::UnboundedSender<Update>,
    ) -> Result<()>;

    async fn get_option(&self, name: &str) -> Result<OptionValue>;

    async fn get_me(&self) -> Result<User>;

    /// Close the session; returns once the binding has let go of it.
    async fn close(&self) -> Result<()>;
}
