//! Implementation of the inventory store
//!
//! Holds the event catalog, the completed-purchase records and the
//! ticket-to-purchase index used for refunds. The store has no knowledge of
//! the wait-list; all queue timing lives in the engine.

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::{RefundError, StoreError};
use crate::purchase::{Event, PurchaseRecord};

/// The inventory store
pub struct Store {
    /// Event catalog, keyed by event id
    events: DashMap<u32, Event>,
    /// Fulfilled purchases, keyed by purchase id
    completed: DashMap<u64, PurchaseRecord>,
    /// Maps each outstanding ticket id to the purchase that issued it.
    ///
    /// Entries are consumed on refund, which is what makes a second refund of
    /// the same ticket report it as unknown.
    ticket_index: Mutex<HashMap<String, u64>>,
}

impl Store {
    /// Create a store holding the given event catalog
    pub fn new(catalog: Vec<Event>) -> Self {
        let events = DashMap::new();
        for event in catalog {
            events.insert(event.id, event);
        }
        Self {
            events,
            completed: DashMap::new(),
            ticket_index: Mutex::new(HashMap::new()),
        }
    }

    /// Get a snapshot of a single event
    pub fn get_event(&self, id: u32) -> Option<Event> {
        self.events.get(&id).map(|e| e.value().clone())
    }

    /// Get a snapshot of the whole catalog, sorted by event id
    pub fn events(&self) -> Vec<Event> {
        let mut all: Vec<Event> = self.events.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|e| e.id);
        all
    }

    /// Number of tickets remaining for an event
    pub fn remaining(&self, id: u32) -> Option<u32> {
        self.events.get(&id).map(|e| e.remaining)
    }

    /// Decrement an event's inventory by `amount`
    ///
    /// This is the authoritative bounds check: the call is refused if fewer
    /// than `amount` tickets remain, and the inventory is left untouched.
    pub fn decrement(&self, event_id: u32, amount: u32) -> Result<(), StoreError> {
        let mut event = self
            .events
            .get_mut(&event_id)
            .ok_or(StoreError::UnknownEvent(event_id))?;
        if event.remaining < amount {
            return Err(StoreError::InsufficientInventory {
                event: event_id,
                remaining: event.remaining,
                requested: amount,
            });
        }
        event.remaining -= amount;
        Ok(())
    }

    /// Increment an event's inventory by `amount` (refunds)
    pub fn increment(&self, event_id: u32, amount: u32) -> Result<(), StoreError> {
        let mut event = self
            .events
            .get_mut(&event_id)
            .ok_or(StoreError::UnknownEvent(event_id))?;
        event.remaining += amount;
        Ok(())
    }

    /// Record a fulfilled purchase and index its ticket ids for refunds
    ///
    /// A purchase id must be recorded at most once; a duplicate is a
    /// programming error.
    pub fn record_completed(&self, record: PurchaseRecord) {
        let id = record.request.id;
        let mut index = self.ticket_index.lock();
        for ticket in &record.ticket_ids {
            index.insert(ticket.clone(), id);
        }
        drop(index);

        let previous = self.completed.insert(id, record);
        assert!(previous.is_none(), "purchase id {id} recorded twice");
    }

    /// Look up a fulfilled purchase by its id
    pub fn get_completed(&self, id: u64) -> Option<PurchaseRecord> {
        self.completed.get(&id).map(|r| r.value().clone())
    }

    /// Refund a set of tickets, all or nothing
    ///
    /// Every ticket id must currently be outstanding; otherwise the offenders
    /// are reported and nothing is credited. On success each ticket is
    /// consumed from the index and its event's inventory is incremented by
    /// one per ticket. Returns the number of tickets refunded.
    pub fn refund(&self, ticket_ids: &[String]) -> Result<usize, RefundError> {
        let mut index = self.ticket_index.lock();

        // Claim every id up front so that a duplicate within the same request
        // is caught like any other unknown id.
        let mut claimed: Vec<(String, u64)> = Vec::with_capacity(ticket_ids.len());
        let mut unknown: Vec<String> = Vec::new();
        for ticket in ticket_ids {
            match index.remove(ticket) {
                Some(purchase) => claimed.push((ticket.clone(), purchase)),
                None => unknown.push(ticket.clone()),
            }
        }

        if !unknown.is_empty() {
            for (ticket, purchase) in claimed {
                index.insert(ticket, purchase);
            }
            return Err(RefundError::UnknownTicketIds(unknown));
        }
        drop(index);

        let mut per_event: HashMap<u32, u32> = HashMap::new();
        for (ticket, purchase) in &claimed {
            match self.completed.get(purchase) {
                Some(record) => {
                    *per_event.entry(record.request.event_id).or_insert(0) += 1;
                }
                None => {
                    error!(ticket = %ticket, purchase, "indexed ticket has no completed record");
                }
            }
        }

        for (event, amount) in per_event {
            if let Err(err) = self.increment(event, amount) {
                error!(event, %err, "refund could not credit inventory");
            } else {
                debug!(event, amount, "refund credited");
            }
        }

        Ok(claimed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::{PurchaseRequest, PurchaseState};

    fn event(id: u32, remaining: u32) -> Event {
        Event {
            id,
            artist: format!("artist-{id}"),
            venue: "venue".into(),
            datetime: "2026-09-01T20:00".into(),
            remaining,
        }
    }

    fn fulfilled(id: u64, event_id: u32, tickets: Vec<&str>) -> PurchaseRecord {
        PurchaseRecord {
            request: PurchaseRequest {
                id,
                event_id,
                tickets: tickets.len() as u32,
            },
            admitted_at: None,
            ticket_ids: tickets.into_iter().map(String::from).collect(),
            state: PurchaseState::Fulfilled,
        }
    }

    #[test]
    fn decrement_refuses_to_go_negative() {
        let store = Store::new(vec![event(1, 2)]);
        assert_eq!(
            store.decrement(1, 3),
            Err(StoreError::InsufficientInventory {
                event: 1,
                remaining: 2,
                requested: 3,
            })
        );
        assert_eq!(store.remaining(1), Some(2));

        assert!(store.decrement(1, 2).is_ok());
        assert_eq!(store.remaining(1), Some(0));
    }

    #[test]
    fn decrement_unknown_event_fails() {
        let store = Store::new(vec![]);
        assert_eq!(store.decrement(9, 1), Err(StoreError::UnknownEvent(9)));
    }

    #[test]
    fn events_are_sorted_by_id() {
        let store = Store::new(vec![event(3, 1), event(1, 1), event(2, 1)]);
        let ids: Vec<u32> = store.events().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn refund_credits_inventory_and_consumes_ids() {
        let store = Store::new(vec![event(1, 0)]);
        store.record_completed(fulfilled(1, 1, vec!["T-1", "T-2"]));

        assert_eq!(store.refund(&["T-1".into(), "T-2".into()]), Ok(2));
        assert_eq!(store.remaining(1), Some(2));

        // already consumed
        assert_eq!(
            store.refund(&["T-1".into()]),
            Err(RefundError::UnknownTicketIds(vec!["T-1".into()]))
        );
        assert_eq!(store.remaining(1), Some(2));
    }

    #[test]
    fn refund_is_all_or_nothing() {
        let store = Store::new(vec![event(1, 0)]);
        store.record_completed(fulfilled(1, 1, vec!["T-1"]));

        let err = store.refund(&["T-1".into(), "T-99".into()]).unwrap_err();
        assert_eq!(err, RefundError::UnknownTicketIds(vec!["T-99".into()]));
        // the known id must still be refundable afterwards
        assert_eq!(store.refund(&["T-1".into()]), Ok(1));
        assert_eq!(store.remaining(1), Some(1));
    }

    #[test]
    fn refund_rejects_duplicate_within_one_request() {
        let store = Store::new(vec![event(1, 0)]);
        store.record_completed(fulfilled(1, 1, vec!["T-1"]));

        let err = store.refund(&["T-1".into(), "T-1".into()]).unwrap_err();
        assert_eq!(err, RefundError::UnknownTicketIds(vec!["T-1".into()]));
        assert_eq!(store.remaining(1), Some(0));
    }

    #[test]
    fn completed_records_keep_ticket_ids_after_refund() {
        let store = Store::new(vec![event(1, 0)]);
        store.record_completed(fulfilled(4, 1, vec!["T-1"]));
        store.refund(&["T-1".into()]).unwrap();

        let record = store.get_completed(4).unwrap();
        assert_eq!(record.ticket_ids, vec!["T-1"]);
    }
}
