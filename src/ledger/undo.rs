//! Undo pointers.
//!
//! At most one row pointer is held per (chat, actor) session, in process
//! memory only. A new confirmed order overwrites the prior pointer, which
//! makes the prior order non-undoable.

use crate::core::session::{KeyedStore, MemoryStore};
use crate::domain::SessionKey;

use super::RowPointer;

/// What we remember about an actor's last committed order.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub row: RowPointer,
    /// Human-readable summary for the undo confirmation, if retained
    pub summary: Option<String>,
}

/// Per-session book of undo pointers.
#[derive(Debug, Default)]
pub struct UndoBook {
    entries: MemoryStore<SessionKey, UndoEntry>,
}

impl UndoBook {
    pub fn new() -> Self {
        Self {
            entries: MemoryStore::new(),
        }
    }

    /// Record the pointer for a freshly appended order, replacing any prior
    /// pointer for the same session.
    pub fn record(&mut self, session: SessionKey, row: RowPointer, summary: String) {
        self.entries.set(
            session,
            UndoEntry {
                row,
                summary: Some(summary),
            },
        );
    }

    /// Look at the stored pointer without consuming it, so a failed delete
    /// leaves the undo retryable.
    pub fn peek(&self, session: &SessionKey) -> Option<&UndoEntry> {
        self.entries.get(session)
    }

    /// Drop the pointer once consumed by a successful undo.
    pub fn clear(&mut self, session: &SessionKey) -> Option<UndoEntry> {
        self.entries.delete(session)
    }
}
