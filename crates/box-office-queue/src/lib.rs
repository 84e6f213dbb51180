//! Core of the box-office queueing system
//!
//! Clients submit a purchase for N tickets to an event; the purchase is
//! admitted to a bounded FIFO wait-list after a randomized verification
//! delay, sits there for a minimum residency, and is then fulfilled: ticket
//! ids are minted and the event's inventory is decremented. Callers poll
//! [`QueueEngine::position()`] instead of blocking.
//!
//! The HTTP shell lives in a separate crate; this crate's boundary is typed
//! Rust only.

#![warn(missing_docs)]

mod error;
mod purchase;
mod queue;
mod store;

pub use error::{AdmissionError, RefundError, StoreError};
pub use purchase::{Event, PurchaseRecord, PurchaseRequest, PurchaseState, TicketMinter};
pub use queue::{Position, QueueEngine};
pub use store::Store;
