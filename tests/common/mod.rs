//! Shared mocks for flow tests: a recording chat surface and an in-memory
//! ledger with a switchable failure mode.

#![allow(dead_code)] // not every helper is used by every test binary

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use brewbot::domain::{ChatId, MessageId, Order};
use brewbot::{ChatApi, InlineKeyboard, Ledger, LedgerError, RowPointer};

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCall {
    Send {
        chat: ChatId,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    Edit {
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    EditKeyboard {
        chat: ChatId,
        message: MessageId,
        keyboard: Option<InlineKeyboard>,
    },
    Ack {
        callback_id: String,
        text: Option<String>,
    },
}

/// Chat surface that records every call.
#[derive(Clone, Default)]
pub struct MockChat {
    pub calls: Arc<Mutex<Vec<ChatCall>>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<ChatCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    /// Texts of plain sent messages, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ChatCall::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatApi for MockChat {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageId> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(ChatCall::Send {
            chat,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(MessageId(calls.len() as i64))
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(ChatCall::Edit {
            chat,
            message,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat: ChatId,
        message: MessageId,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(ChatCall::EditKeyboard {
            chat,
            message,
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.calls.lock().unwrap().push(ChatCall::Ack {
            callback_id: callback_id.to_string(),
            text: text.map(String::from),
        });
        Ok(())
    }
}

#[derive(Default)]
struct LedgerState {
    rows: Vec<Order>,
    fail_appends: bool,
    fail_deletes: bool,
    deletes: Vec<RowPointer>,
}

/// In-memory ledger. Rows are 1-based; deleting a row shifts later rows up,
/// like the real store.
#[derive(Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.state.lock().unwrap().fail_appends = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().unwrap().fail_deletes = fail;
    }

    pub fn rows(&self) -> Vec<Order> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn deletes(&self) -> Vec<RowPointer> {
        self.state.lock().unwrap().deletes.clone()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn append(&self, order: &Order) -> Result<RowPointer, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_appends {
            return Err(LedgerError::Timeout);
        }
        state.rows.push(order.clone());
        Ok(RowPointer(state.rows.len() as u64))
    }

    async fn delete_row(&self, row: RowPointer) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return Err(LedgerError::Timeout);
        }
        let idx = (row.0 as usize)
            .checked_sub(1)
            .filter(|i| *i < state.rows.len())
            .ok_or_else(|| LedgerError::Rejected(format!("no such row: {}", row)))?;
        state.rows.remove(idx);
        state.deletes.push(row);
        Ok(())
    }
}
