//! brewbot - Telegram coffee-order bot with a spreadsheet ledger
//!
//! A user picks a drink from an inline menu, is walked through the optional
//! modifiers (milk, bring-your-own-cup, quantity), confirms, and the order is
//! appended as a row to an external spreadsheet ledger. `/undo` deletes the
//! actor's last appended row.
//!
//! # Architecture
//!
//! - Inbound updates are deduplicated by update id through a bounded
//!   recency set before they reach the flow
//! - The flow is a per-card state machine driven by typed callback actions
//! - Ledger appends capture the written row's position, which is the undo
//!   handle; all flow state is process-local
//!
//! # Modules
//!
//! - `adapters`: the chat surface (Telegram client, `ChatApi` trait)
//! - `core`: dedup, single-fire gate, session state, the order flow
//! - `domain`: ids, composite keys, actions, orders
//! - `ledger`: spreadsheet append/delete and undo pointers
//! - `menu`: the drink catalog with its static fallback
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the bot
//! BREWBOT_TOKEN=... brewbot serve
//!
//! # Inspect the resolved menu
//! brewbot menu
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ledger;
pub mod menu;

// Re-export main types at crate root for convenience
pub use crate::core::{Actor, CallbackEvent, OnceGate, OrderFlow, Pricing, RecencySet, TextEvent};
pub use adapters::{ChatApi, InlineKeyboard, TelegramClient};
pub use domain::{Action, Order};
pub use ledger::{Ledger, LedgerError, RowPointer, SheetsLedger, UndoBook};
pub use menu::{fallback_menu, load_menu, MenuItem};
