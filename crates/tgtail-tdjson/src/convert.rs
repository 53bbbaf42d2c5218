//! rust-tdlib types -> `tgtail-core` types.

use rust_tdlib::types as td;

use tgtail_core::{
    config::TdlibParameters,
    domain::{ChatId, MessageId, UserId},
    updates::{
        ChatAction, FormattedText, Message, MessageContent, OptionValue, TextEntity,
        TextEntityType, Update, User,
    },
};

pub(crate) fn parameters(p: &TdlibParameters) -> td::TdlibParameters {
    td::TdlibParameters::builder()
        .use_test_dc(p.use_test_dc)
        .database_directory(p.database_directory.to_string_lossy())
        .files_directory(p.files_directory.to_string_lossy())
        .use_file_database(p.use_file_database)
        .use_chat_info_database(p.use_chat_info_database)
        .use_message_database(p.use_message_database)
        .use_secret_chats(p.use_secret_chats)
        .api_id(p.api_id)
        .api_hash(&p.api_hash)
        .system_language_code(&p.system_language_code)
        .device_model(&p.device_model)
        .system_version(&p.system_version)
        .application_version(&p.application_version)
        .enable_storage_optimizer(p.enable_storage_optimizer)
        .ignore_file_names(p.ignore_file_names)
        .build()
}

pub(crate) fn update(update: &td::Update) -> Update {
    match update {
        td::Update::NewMessage(new) => Update::NewMessage {
            message: message(new.message()),
        },
        td::Update::ChatAction(action) => Update::ChatAction {
            chat_id: ChatId(action.chat_id()),
            action: chat_action(action.action()),
        },
        _ => Update::Other,
    }
}

fn message(m: &td::Message) -> Message {
    Message {
        id: MessageId(m.id()),
        chat_id: ChatId(m.chat_id()),
        date: i64::from(m.date()),
        content: content(m.content()),
    }
}

fn content(c: &td::MessageContent) -> MessageContent {
    match c {
        td::MessageContent::MessageText(t) => MessageContent::Text {
            text: formatted_text(t.text()),
        },
        td::MessageContent::MessagePhoto(p) => MessageContent::Photo {
            caption: formatted_text(p.caption()),
        },
        td::MessageContent::MessageDocument(d) => MessageContent::Document {
            caption: formatted_text(d.caption()),
        },
        td::MessageContent::MessageSticker(_) => MessageContent::Sticker,
        _ => MessageContent::Other,
    }
}

fn formatted_text(t: &td::FormattedText) -> FormattedText {
    FormattedText {
        text: t.text().clone(),
        entities: t.entities().iter().map(text_entity).collect(),
    }
}

fn text_entity(e: &td::TextEntity) -> TextEntity {
    TextEntity {
        offset: e.offset(),
        length: e.length(),
        kind: entity_type(e.type_()),
    }
}

fn entity_type(t: &td::TextEntityType) -> TextEntityType {
    use td::TextEntityType as T;

    match t {
        T::Bold(_) => TextEntityType::Bold,
        T::Italic(_) => TextEntityType::Italic,
        T::Underline(_) => TextEntityType::Underline,
        T::Strikethrough(_) => TextEntityType::Strikethrough,
        T::Code(_) => TextEntityType::Code,
        T::Pre(_) => TextEntityType::Pre,
        T::PreCode(p) => TextEntityType::PreCode {
            language: p.language().clone(),
        },
        T::Url(_) => TextEntityType::Url,
        T::TextUrl(u) => TextEntityType::TextUrl {
            url: u.url().clone(),
        },
        T::Mention(_) => TextEntityType::Mention,
        T::MentionName(m) => TextEntityType::MentionName {
            user_id: UserId(i64::from(m.user_id())),
        },
        T::Hashtag(_) => TextEntityType::Hashtag,
        T::BotCommand(_) => TextEntityType::BotCommand,
        T::EmailAddress(_) => TextEntityType::EmailAddress,
        T::PhoneNumber(_) => TextEntityType::PhoneNumber,
        _ => TextEntityType::Other,
    }
}

fn chat_action(a: &td::ChatAction) -> ChatAction {
    match a {
        td::ChatAction::Typing(_) => ChatAction::Typing,
        td::ChatAction::Cancel(_) => ChatAction::Cancel,
        _ => ChatAction::Other,
    }
}

pub(crate) fn option_value(v: &td::OptionValue) -> OptionValue {
    match v {
        td::OptionValue::Boolean(b) => OptionValue::Boolean { value: b.value() },
        td::OptionValue::Integer(i) => OptionValue::Integer {
            value: i64::from(i.value()),
        },
        td::OptionValue::String(s) => OptionValue::String {
            value: s.value().clone(),
        },
        _ => OptionValue::Empty,
    }
}

pub(crate) fn user(u: &td::User) -> User {
    User {
        id: UserId(i64::from(u.id())),
        first_name: u.first_name().clone(),
        last_name: u.last_name().clone(),
        username: u.username().clone(),
    }
}
