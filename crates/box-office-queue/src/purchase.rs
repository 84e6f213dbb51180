//! Purchase data model and ticket-id minting

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A concert the store sells tickets for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Unique event id
    pub id: u32,
    /// The artist performing
    pub artist: String,
    /// Where the concert takes place
    pub venue: String,
    /// When the concert takes place
    pub datetime: String,
    /// Number of tickets still available
    pub remaining: u32,
}

/// The immutable identity of a purchase, fixed at submission time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PurchaseRequest {
    /// Unique, monotonically assigned purchase id
    pub id: u64,
    /// The event the tickets are for
    pub event_id: u32,
    /// Number of tickets requested, always greater than zero
    pub tickets: u32,
}

/// Lifecycle state of a purchase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurchaseState {
    /// Id allocated, admission delay still in flight
    Reserved,
    /// In the wait-list
    Waiting,
    /// Removed from the wait-list with tickets issued
    Fulfilled,
    /// Refused at fulfillment time (insufficient inventory)
    Rejected,
    /// Removed by the client before fulfillment
    Cancelled,
}

/// A purchase as tracked by the engine: identity plus fulfillment result
#[derive(Clone, Debug)]
pub struct PurchaseRecord {
    /// The request that created this record
    pub request: PurchaseRequest,
    /// When the record entered the wait-list, set on `Reserved -> Waiting`
    pub admitted_at: Option<Instant>,
    /// Ticket ids issued at fulfillment, empty before that
    pub ticket_ids: Vec<String>,
    /// Current lifecycle state
    pub state: PurchaseState,
}

impl PurchaseRecord {
    /// Create a fresh record in the `Reserved` state
    pub fn new(request: PurchaseRequest) -> Self {
        Self {
            request,
            admitted_at: None,
            ticket_ids: Vec::new(),
            state: PurchaseState::Reserved,
        }
    }
}

/// Process-wide ticket-id counter
///
/// Ids have the form `T-<n>` with `n` strictly increasing. An id is never
/// handed out twice, not even after the ticket it denotes is refunded.
#[derive(Debug)]
pub struct TicketMinter {
    next: AtomicU64,
}

impl TicketMinter {
    /// Create a minter starting at `T-1`
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Mint `count` sequential ticket ids
    pub fn mint(&self, count: u32) -> Vec<String> {
        let start = self.next.fetch_add(count as u64, Ordering::Relaxed);
        (start..start + count as u64)
            .map(|n| format!("T-{n}"))
            .collect()
    }
}

impl Default for TicketMinter {
    fn default() -> Self {
        Self::new()
    }
}
