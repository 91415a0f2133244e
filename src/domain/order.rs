//! The committed order record.
//!
//! An `Order` is created by the flow on confirmation, appended to the ledger,
//! and never mutated afterwards; undo deletes the whole row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ChatId, MessageId, UpdateId, UserId};

/// One committed order, immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// When the order was confirmed
    pub timestamp: DateTime<Utc>,

    /// Chat the order was placed in
    pub chat: ChatId,

    /// Actor who placed it
    pub user: UserId,

    /// Actor's handle (username), empty if none
    pub handle: String,

    /// Actor's display name
    pub display_name: String,

    /// Resolved item label, including modifier annotations
    pub item_label: String,

    /// Unit price after modifiers, rounded to two decimals
    pub unit_price: f64,

    /// Quantity in [1,10]
    pub quantity: u32,

    /// unit_price * quantity, rounded to two decimals
    pub total: f64,

    /// Whether the milk modifier was chosen
    pub milk: bool,

    /// Message the order card lived on (traceability)
    pub message: MessageId,

    /// Update that carried the confirm (traceability)
    pub update: UpdateId,
}

impl Order {
    /// Human-readable one-liner used for the saved card and the undo summary.
    pub fn summary(&self) -> String {
        format!(
            "{} x {} — {:.2}",
            self.quantity, self.item_label, self.total
        )
    }
}

/// Round a monetary value to two decimal places. Applied at every point of
/// computation: the unit price is rounded before multiplication, the total
/// after.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
