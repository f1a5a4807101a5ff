//! Synchronous, strictly per-URL-ordered event delivery (spec §4.G).
//!
//! The bus itself is deliberately dumb: it does no buffering and keeps
//! no per-URL state. Ordering falls out of the fact that every event
//! for a given URL is published sequentially by the single task that
//! owns that URL, and the bus never reorders or defers a publish.

pub mod bus;
pub mod legacy;

pub use bus::{EventBus, EventHandler, FnHandler};
pub use legacy::LegacyCallbackAdapter;
