//! Order-flow logic: deduplication, single-fire gating, session state,
//! and the conversational state machine.

pub mod flow;
pub mod recency;
pub mod session;

pub use flow::{Actor, CallbackEvent, OrderFlow, Pricing, TextEvent};
pub use recency::{OnceGate, RecencySet};
pub use session::{KeyedStore, MemoryStore};
