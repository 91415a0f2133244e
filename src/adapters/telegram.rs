//! Telegram Bot API client.
//!
//! Thin wire wrapper: long-polls updates and performs the message edits the
//! flow asks for. No flow logic lives here.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{ChatId, MessageId};

use super::{ChatApi, InlineKeyboard};

/// Telegram Bot API client
pub struct TelegramClient {
    /// Bot token
    bot_token: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Response envelope from the Telegram API
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Message result from sendMessage
#[derive(Debug, Deserialize)]
struct MessageResult {
    message_id: i64,
}

/// One inbound update from getUpdates.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    /// Display name the way Telegram renders it.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<IncomingMessage>,
    pub data: Option<String>,
}

impl TelegramClient {
    /// Create a new Telegram client with a bounded per-request timeout.
    pub fn new(bot_token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            // long-poll requests hold the connection open for poll_timeout,
            // so the client timeout must sit above it
            .timeout(timeout + Duration::from_secs(35))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { bot_token, client })
    }

    /// Build API URL
    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    /// Call a Bot API method with a JSON body and decode the envelope.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<Option<T>> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to call Telegram {}", method))?;

        let result: TelegramResponse<T> = response
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        if !result.ok {
            anyhow::bail!(
                "Telegram API error on {}: {}",
                method,
                result.description.unwrap_or_default()
            );
        }

        Ok(result.result)
    }

    /// Long-poll for updates past `offset`.
    pub async fn get_updates(&self, offset: i64, poll_timeout: Duration) -> Result<Vec<Update>> {
        let updates: Option<Vec<Update>> = self
            .call(
                "getUpdates",
                serde_json::json!({
                    "offset": offset,
                    "timeout": poll_timeout.as_secs(),
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;

        Ok(updates.unwrap_or_default())
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageId> {
        let mut body = serde_json::json!({ "chat_id": chat.0, "text": text });
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb)?;
        }

        let result: Option<MessageResult> = self.call("sendMessage", body).await?;

        Ok(MessageId(result.map(|r| r.message_id).unwrap_or(0)))
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        let mut body = serde_json::json!({
            "chat_id": chat.0,
            "message_id": message.0,
            "text": text,
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb)?;
        }

        self.call::<serde_json::Value>("editMessageText", body)
            .await?;
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat: ChatId,
        message: MessageId,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        let mut body = serde_json::json!({
            "chat_id": chat.0,
            "message_id": message.0,
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb)?;
        }

        self.call::<serde_json::Value>("editMessageReplyMarkup", body)
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = serde_json::Value::String(text.to_string());
        }

        self.call::<serde_json::Value>("answerCallbackQuery", body)
            .await?;
        Ok(())
    }
}
