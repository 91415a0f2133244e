//! Data structures for the order flow.
//!
//! - `ids`: newtype identifiers and the composite keys the flow is scoped by
//! - `action`: typed callback actions (decoded once at the boundary)
//! - `order`: the committed order record and money rounding

pub mod action;
pub mod ids;
pub mod order;

pub use action::Action;
pub use ids::{ChatId, MessageId, PendingKey, PromptKey, SessionKey, ThreadKey, UpdateId, UserId};
pub use order::{round2, Order};
