//! `TdBackend` over `rust-tdlib`.
//!
//! The rust-tdlib client and its worker live on one task, which answers
//! requests from `RustTdlib` in arrival order. Authorization is the worker's
//! job: it sends the parameters and asks for phone number, code and password
//! on the terminal.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rust_tdlib::{
    client::{Client, Worker},
    tdjson,
    types::{Close, GetMe, GetOption, TdlibParameters as TdParameters, Update as TdUpdate},
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use tgtail_core::{
    config::TdlibParameters,
    errors::Error,
    updates::{OptionValue, Update, User},
    Result,
};

use crate::{backend::TdBackend, convert};

/// Capacity of the channel rust-tdlib pushes raw updates into.
const UPDATE_BUFFER: usize = 64;
const COMMAND_BUFFER: usize = 8;

enum Command {
    GetOption {
        name: String,
        reply: oneshot::Sender<Result<OptionValue>>,
    },
    GetMe {
        reply: oneshot::Sender<Result<User>>,
    },
    Close {
        reply: oneshot::Sender<Result<()>>,
    },
}

fn td_error(e: impl std::fmt::Display) -> Error {
    Error::Td(e.to_string())
}

/// Production binding, linked against `libtdjson`.
pub struct RustTdlib {
    commands: mpsc::Sender<Command>,
    // Handed to the session task on `connect`.
    inbox: Mutex<Option<mpsc::Receiver<Command>>>,
}

impl RustTdlib {
    pub fn new() -> Self {
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        Self {
            commands,
            inbox: Mutex::new(Some(inbox)),
        }
    }

    fn take_inbox(&self) -> Option<mpsc::Receiver<Command>> {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn is_connected(&self) -> bool {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    async fn request<R, F>(&self, command: F) -> Result<R>
    where
        R: Send,
        F: FnOnce(oneshot::Sender<Result<R>>) -> Command + Send,
    {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| Error::Closed)?;
        answer.await.map_err(|_| Error::Closed)?
    }
}

impl Default for RustTdlib {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TdBackend for RustTdlib {
    fn set_log_verbosity(&self, level: i32) -> Result<()> {
        tdjson::set_log_verbosity_level(level);
        Ok(())
    }

    async fn connect(
        &self,
        params: &TdlibParameters,
        updates: mpsc::UnboundedSender<Update>,
    ) -> Result<()> {
        let commands = self
            .take_inbox()
            .ok_or_else(|| Error::External("tdlib session already connected".to_string()))?;

        let (ready, connected) = oneshot::channel();
        tokio::spawn(serve(
            convert::parameters(params),
            updates,
            ready,
            commands,
        ));
        connected.await.map_err(|_| Error::Closed)?
    }

    async fn get_option(&self, name: &str) -> Result<OptionValue> {
        self.request(|reply| Command::GetOption {
            name: name.to_string(),
            reply,
        })
        .await
    }

    async fn get_me(&self) -> Result<User> {
        self.request(|reply| Command::GetMe { reply }).await
    }

    async fn close(&self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        self.request(|reply| Command::Close { reply }).await
    }
}

/// Own the rust-tdlib client for the lifetime of the session.
async fn serve(
    params: TdParameters,
    updates: mpsc::UnboundedSender<Update>,
    ready: oneshot::Sender<Result<()>>,
    mut commands: mpsc::Receiver<Command>,
) {
    let (td_updates, mut td_rx) = mpsc::channel::<Box<TdUpdate>>(UPDATE_BUFFER);
    let forward = tokio::spawn(async move {
        while let Some(update) = td_rx.recv().await {
            if updates.send(convert::update(&update)).is_err() {
                break;
            }
        }
    });

    let client = match Client::builder()
        .with_tdlib_parameters(params)
        .with_updates_sender(td_updates)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            let _ = ready.send(Err(td_error(e)));
            return;
        }
    };
    let mut worker = match Worker::builder().build() {
        Ok(worker) => worker,
        Err(e) => {
            let _ = ready.send(Err(td_error(e)));
            return;
        }
    };

    let waiter = worker.start();
    let client = match worker.bind_client(client).await {
        Ok(client) => client,
        Err(e) => {
            worker.stop();
            let _ = ready.send(Err(Error::Authorization(e.to_string())));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut closing = None;
    while let Some(command) = commands.recv().await {
        match command {
            Command::GetOption { name, reply } => {
                let answer = client
                    .get_option(GetOption::builder().name(&name).build())
                    .await
                    .map(|value| convert::option_value(&value))
                    .map_err(td_error);
                let _ = reply.send(answer);
            }
            Command::GetMe { reply } => {
                let answer = client
                    .get_me(GetMe::builder().build())
                    .await
                    .map(|user| convert::user(&user))
                    .map_err(td_error);
                let _ = reply.send(answer);
            }
            Command::Close { reply } => {
                let answer = client
                    .close(Close::builder().build())
                    .await
                    .map(|_| ())
                    .map_err(td_error);
                closing = Some((reply, answer));
                break;
            }
        }
    }

    worker.stop();
    let _ = waiter.await;
    forward.abort();
    debug!("tdlib worker stopped");

    if let Some((reply, answer)) = closing {
        info!("tdlib session closed");
        let _ = reply.send(answer);
    }
}
