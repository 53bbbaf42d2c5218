use chrono::DateTime;
use tracing::{debug, info};

use crate::{
    ports::Listener,
    updates::{FormattedText, Message, MessageContent, Update},
};

/// Sink for the plain-text messages the consumer observes.
pub trait MessageLog: Send + Sync {
    fn text_message(&self, message: &Message, text: &FormattedText);
}

/// Writes observed messages to the tracing log, one line for the body and one
/// for its entities.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl MessageLog for TracingLog {
    fn text_message(&self, message: &Message, text: &FormattedText) {
        let sent_at = DateTime::from_timestamp(message.date, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        info!(
            chat_id = message.chat_id.0,
            message_id = message.id.0,
            sent_at = %sent_at,
            "{}",
            message_line(text)
        );
        info!("{}", entities_line(text));
    }
}

pub fn message_line(text: &FormattedText) -> String {
    format!("Message: {:?}", text.text)
}

pub fn entities_line(text: &FormattedText) -> String {
    format!("Text Entities: {:?}", text.entities)
}

/// Counters for one consumption run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    pub received: u64,
    pub logged: u64,
}

/// The plain-text body of a new message, if that is what `update` carries.
pub fn plain_text(update: &Update) -> Option<(&Message, &FormattedText)> {
    let Update::NewMessage { message } = update else {
        return None;
    };
    let MessageContent::Text { text } = &message.content else {
        return None;
    };
    Some((message, text))
}

/// Drain `listener` until the session closes it, logging every plain-text
/// message in delivery order.
///
/// The listener is released when this returns.
pub async fn consume(mut listener: Listener, log: &dyn MessageLog) -> ConsumeReport {
    let mut report = ConsumeReport::default();

    while let Some(update) = listener.recv().await {
        report.received += 1;
        match plain_text(&update) {
            Some((message, text)) => {
                log.text_message(message, text);
                report.logged += 1;
            }
            None => debug!(kind = update.kind(), "skipping update"),
        }
    }

    debug!(
        received = report.received,
        logged = report.logged,
        "update stream closed"
    );
    report
}
