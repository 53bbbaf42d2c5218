//! Fakes shared by the unit tests in this crate.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    config::{Config, TdlibParameters},
    consumer::{entities_line, message_line, MessageLog},
    domain::{ChatId, MessageId, UserId},
    errors::Error,
    ports::{Listener, SessionPort},
    shutdown::Terminator,
    updates::{FormattedText, Message, MessageContent, OptionValue, Update, User},
    Result,
};

pub fn test_config() -> Config {
    Config {
        tdlib: TdlibParameters::new(1, "hash".to_string(), Path::new("/tmp/tgtail-test")),
        log_verbosity: 1,
    }
}

pub fn new_message(id: i64, content: MessageContent) -> Update {
    Update::NewMessage {
        message: Message {
            id: MessageId(id),
            chat_id: ChatId(100),
            date: 1_700_000_000,
            content,
        },
    }
}

/// Scripted session: records calls, fails on demand, replays updates.
pub struct FakeSession {
    calls: Mutex<Vec<String>>,
    fail_on: Option<String>,
    version: OptionValue,
    verbosity: Mutex<Option<i32>>,
    stops: AtomicUsize,
    updates: Mutex<Vec<Update>>,
    close_after_script: bool,
    // How long `stop` keeps running after it has closed the stream.
    stop_lag: Option<Duration>,
    // Held open until `stop` when the script does not close the stream.
    live_sender: Mutex<Option<mpsc::UnboundedSender<Update>>>,
    releases: Arc<AtomicUsize>,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            version: OptionValue::String {
                value: "1.8.45".to_string(),
            },
            verbosity: Mutex::new(None),
            stops: AtomicUsize::new(0),
            updates: Mutex::new(Vec::new()),
            close_after_script: true,
            stop_lag: None,
            live_sender: Mutex::new(None),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FakeSession {
    pub fn failing_on(call: &str) -> Self {
        Self {
            fail_on: Some(call.to_string()),
            ..Self::default()
        }
    }

    pub fn with_version(version: OptionValue) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn with_updates(updates: Vec<Update>, close_after_script: bool) -> Self {
        Self {
            updates: Mutex::new(updates),
            close_after_script,
            ..Self::default()
        }
    }

    /// `stop` closes the stream first and returns only after `lag`, like a
    /// backend waiting for its close confirmation.
    pub fn with_slow_stop(mut self, lag: Duration) -> Self {
        self.stop_lag = Some(lag);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn verbosity(&self) -> Option<i32> {
        *self.verbosity.lock().unwrap()
    }

    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn listener_releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn record(&self, call: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.fail_on.as_deref() == Some(call) {
            return Err(Error::Td(format!("{call} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionPort for FakeSession {
    async fn set_log_verbosity(&self, level: i32) -> Result<()> {
        self.record("set_log_verbosity")?;
        *self.verbosity.lock().unwrap() = Some(level);
        Ok(())
    }

    async fn start(&self, _params: &TdlibParameters) -> Result<()> {
        self.record("start")
    }

    async fn get_option(&self, name: &str) -> Result<OptionValue> {
        self.record(&format!("get_option:{name}"))?;
        Ok(self.version.clone())
    }

    async fn get_me(&self) -> Result<User> {
        self.record("get_me")?;
        Ok(User {
            id: UserId(7),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
        })
    }

    fn listen(&self) -> Listener {
        let (tx, rx) = mpsc::unbounded_channel();
        for u in self.updates.lock().unwrap().drain(..) {
            let _ = tx.send(u);
        }
        // A stopped session hands out an already-ended stream.
        if !self.close_after_script && self.stop_calls() == 0 {
            *self.live_sender.lock().unwrap() = Some(tx);
        }
        let releases = self.releases.clone();
        Listener::new(rx, move || {
            releases.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.live_sender.lock().unwrap().take();
        if let Some(lag) = self.stop_lag {
            tokio::time::sleep(lag).await;
        }
        self.record("stop")
    }
}

/// Collects the lines `TracingLog` would emit.
#[derive(Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl MessageLog for RecordingLog {
    fn text_message(&self, _message: &Message, text: &FormattedText) {
        let mut lines = self.lines.lock().unwrap();
        lines.push(message_line(text));
        lines.push(entities_line(text));
    }
}

#[derive(Clone, Default)]
pub struct RecordingTerminator {
    codes: Arc<Mutex<Vec<i32>>>,
}

impl RecordingTerminator {
    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}
