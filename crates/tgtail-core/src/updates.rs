//! Session objects as the core sees them.
//!
//! Adapters decode the backend's wire objects and map them onto these closed
//! enums once; consumers match on variants and never inspect raw payloads.
//! Kinds we do not model land in `Other`.

use crate::domain::{ChatId, MessageId, UserId};

/// One item from the session's update stream.
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    NewMessage { message: Message },
    ChatAction { chat_id: ChatId, action: ChatAction },
    Other,
}

impl Update {
    /// Short, stable name of the variant (for logs).
    pub fn kind(&self) -> &'static str {
        match self {
            Update::NewMessage { .. } => "new_message",
            Update::ChatAction { .. } => "chat_action",
            Update::Other => "other",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    /// Unix time (seconds) the message was sent.
    pub date: i64,
    pub content: MessageContent,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MessageContent {
    Text { text: FormattedText },
    Photo { caption: FormattedText },
    Document { caption: FormattedText },
    Sticker,
    Other,
}

/// Text with formatting annotations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormattedText {
    pub text: String,
    pub entities: Vec<TextEntity>,
}

/// A formatted span. `offset` and `length` are in UTF-16 code units.
#[derive(Clone, Debug, PartialEq)]
pub struct TextEntity {
    pub offset: i32,
    pub length: i32,
    pub kind: TextEntityType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TextEntityType {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Pre,
    PreCode { language: String },
    Url,
    TextUrl { url: String },
    Mention,
    MentionName { user_id: UserId },
    Hashtag,
    BotCommand,
    EmailAddress,
    PhoneNumber,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    Cancel,
    Other,
}

/// Value of a backend option (`getOption`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Boolean { value: bool },
    Empty,
    Integer { value: i64 },
    String { value: String },
}

/// The authorized account (`getMe`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    /// Public @handle, empty when the account has none.
    pub username: String,
}

impl User {
    pub fn handle(&self) -> &str {
        &self.username
    }
}
