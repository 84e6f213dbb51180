//! Error taxonomy of the queueing core

use thiserror::Error;

/// Reasons an `admit` call can be refused
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// The wait-list already holds `capacity` waiting purchases
    #[error("the queue is full")]
    QueueFull,

    /// The purchase names an event the store does not know
    #[error("no event with id {0}")]
    UnknownEvent(u32),

    /// A purchase must request at least one ticket
    #[error("ticket count must be greater than zero")]
    InvalidTicketCount,

    /// Best-effort check at admission time; the authoritative check happens
    /// again at fulfillment
    #[error("only {remaining} tickets remain for event {event}")]
    InsufficientInventory {
        /// The event the purchase was for
        event: u32,
        /// Tickets remaining at check time
        remaining: u32,
    },
}

/// Reasons a refund can be refused
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RefundError {
    /// One or more ticket ids were never issued or were already refunded
    #[error("unknown ticket ids: {0:?}")]
    UnknownTicketIds(Vec<String>),
}

/// Errors raised by inventory mutation
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The event id does not exist in the store
    #[error("no event with id {0}")]
    UnknownEvent(u32),

    /// Decrementing by `requested` would drive the inventory negative
    #[error("event {event} has {remaining} tickets left, {requested} requested")]
    InsufficientInventory {
        /// The event whose inventory was touched
        event: u32,
        /// Tickets remaining at check time
        remaining: u32,
        /// Tickets the purchase asked for
        requested: u32,
    },
}
