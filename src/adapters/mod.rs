//! Adapter interfaces for the chat surface.
//!
//! The flow drives the conversation through the `ChatApi` trait; the Telegram
//! client is the production implementation, tests use a recording mock.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Action, ChatId, MessageId};

pub use telegram::TelegramClient;

/// An inline keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<Button>>,
}

/// One inline button carrying an encoded action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, action: Action) -> Self {
        Self {
            text: text.into(),
            callback_data: action.encode(),
        }
    }
}

impl InlineKeyboard {
    /// One button per row.
    pub fn rows(buttons: Vec<Button>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// All buttons on a single row.
    pub fn row(buttons: Vec<Button>) -> Self {
        Self {
            inline_keyboard: vec![buttons],
        }
    }
}

/// The chat surface the flow renders to.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a new message, returning its id.
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageId>;

    /// Replace a message's text and keyboard. `None` removes the keyboard.
    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()>;

    /// Replace only the keyboard of a message.
    async fn edit_keyboard(
        &self,
        chat: ChatId,
        message: MessageId,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()>;

    /// Acknowledge a callback query, optionally with a toast text.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
