//! Append-only order ledger.
//!
//! Committed orders are appended as rows to an external spreadsheet-style
//! store. The 1-based position of the appended row is captured at append time
//! and is the only handle undo has; deleting a row shifts every later row up
//! by one, so pointers held for other actors can go stale after an undo.
//! Accepted for single-writer-at-a-time usage.

pub mod sheets;
pub mod undo;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Order;

pub use sheets::SheetsLedger;
pub use undo::{UndoBook, UndoEntry};

/// 1-based position of a row within the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPointer(pub u64);

impl std::fmt::Display for RowPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request timed out")]
    Timeout,

    #[error("ledger rejected the request: {0}")]
    Rejected(String),

    #[error("ledger transport error: {0}")]
    Transport(String),

    #[error("could not locate appended row in {0:?}")]
    BadLocator(String),
}

/// The external append-only store. No internal retries: a failed append is
/// surfaced to the caller, who decides the user-facing fallback.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append one order row. Returns the 1-based position of the new row.
    async fn append(&self, order: &Order) -> Result<RowPointer, LedgerError>;

    /// Delete exactly one row by position.
    async fn delete_row(&self, row: RowPointer) -> Result<(), LedgerError>;
}

/// Extract the trailing row number out of the locator the store returns for
/// a write, e.g. `Orders!A17:L17` -> 17.
pub fn parse_row_pointer(locator: &str) -> Result<RowPointer, LedgerError> {
    let digits: String = locator
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    digits
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .map(RowPointer)
        .ok_or_else(|| LedgerError::BadLocator(locator.to_string()))
}

/// Render an order in the fixed ledger column order.
pub fn order_row(order: &Order) -> Vec<String> {
    vec![
        order.timestamp.to_rfc3339(),
        order.chat.to_string(),
        order.user.to_string(),
        order.handle.clone(),
        order.display_name.clone(),
        order.item_label.clone(),
        format!("{:.2}", order.unit_price),
        order.quantity.to_string(),
        format!("{:.2}", order.total),
        if order.milk { "1" } else { "0" }.to_string(),
        order.message.to_string(),
        order.update.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId, UpdateId, UserId};
    use chrono::Utc;

    #[test]
    fn test_parse_row_pointer() {
        assert_eq!(parse_row_pointer("Orders!A17:L17").unwrap(), RowPointer(17));
        assert_eq!(parse_row_pointer("Sheet1!A2:L2").unwrap(), RowPointer(2));
        assert_eq!(parse_row_pointer("A1234").unwrap(), RowPointer(1234));
    }

    #[test]
    fn test_parse_row_pointer_bad_locator() {
        assert!(matches!(
            parse_row_pointer("Orders!A:L"),
            Err(LedgerError::BadLocator(_))
        ));
        assert!(matches!(
            parse_row_pointer(""),
            Err(LedgerError::BadLocator(_))
        ));
        // zero is not a valid 1-based position
        assert!(matches!(
            parse_row_pointer("A0"),
            Err(LedgerError::BadLocator(_))
        ));
    }

    #[test]
    fn test_order_row_column_order() {
        let order = Order {
            timestamp: Utc::now(),
            chat: ChatId(-100123),
            user: UserId(42),
            handle: "ada".to_string(),
            display_name: "Ada Lovelace".to_string(),
            item_label: "Latte, oat milk".to_string(),
            unit_price: 3.5,
            quantity: 2,
            total: 7.0,
            milk: true,
            message: MessageId(900),
            update: UpdateId(55),
        };

        let row = order_row(&order);
        assert_eq!(row.len(), 12);
        assert_eq!(row[1], "-100123");
        assert_eq!(row[2], "42");
        assert_eq!(row[3], "ada");
        assert_eq!(row[4], "Ada Lovelace");
        assert_eq!(row[5], "Latte, oat milk");
        assert_eq!(row[6], "3.50");
        assert_eq!(row[7], "2");
        assert_eq!(row[8], "7.00");
        assert_eq!(row[9], "1");
        assert_eq!(row[10], "900");
        assert_eq!(row[11], "55");
    }
}
