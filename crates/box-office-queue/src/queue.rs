//! Implementation of the queue engine
//!
//! The engine owns the bounded wait-list and the two time-staged transitions
//! of a purchase: the randomized admission delay (`Reserved -> Waiting`) and
//! the minimum head residency before fulfillment (`Waiting -> Fulfilled`).
//! A single background worker drives both on a fixed tick; every wait-list
//! mutation and every `position` read goes through one mutex, so a query can
//! never observe a purchase mid-move.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use box_office_core::Config;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::error::AdmissionError;
use crate::purchase::{PurchaseRecord, PurchaseRequest, PurchaseState, TicketMinter};
use crate::store::Store;

/// Result of a `position` query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Position {
    /// The purchase is fulfilled; carries the issued ticket ids
    Completed(Vec<String>),
    /// The purchase is waiting at this zero-based distance from the head
    QueueIndex(usize),
    /// The engine does not track this id: never issued, still inside the
    /// admission delay, cancelled, or rejected
    Unknown,
}

/// An admission scheduled to fire once its delay elapses
struct PendingAdmission {
    due: Instant,
    id: u64,
}

// BinaryHeap is a max-heap; reverse the ordering so the earliest due (and,
// among equals, the smallest id) sits on top.
impl Ord for PendingAdmission {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for PendingAdmission {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingAdmission {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl Eq for PendingAdmission {}

/// Everything the engine mutates, behind a single lock
struct EngineState {
    /// FIFO of waiting purchase ids
    wait_list: VecDeque<u64>,
    /// Records the engine still owns: `Reserved`, `Waiting`, and `Reserved`
    /// records already cancelled but not yet dropped by their timer
    records: HashMap<u64, PurchaseRecord>,
    /// Admissions whose delay has not yet elapsed
    pending: BinaryHeap<PendingAdmission>,
}

/// The queue engine
pub struct QueueEngine {
    store: Arc<Store>,
    config: Config,
    next_id: AtomicU64,
    state: Arc<Mutex<EngineState>>,
    shutdown: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl QueueEngine {
    /// Create a new [`QueueEngine`] and start its fulfillment worker
    pub fn new(store: Arc<Store>, config: Config) -> Self {
        let state = Arc::new(Mutex::new(EngineState {
            wait_list: VecDeque::new(),
            records: HashMap::new(),
            pending: BinaryHeap::new(),
        }));
        let minter = Arc::new(TicketMinter::new());

        let (shutdown, shutdown_receiver) = bounded(1);
        let worker = {
            let state = state.clone();
            let store = store.clone();
            std::thread::spawn(move || {
                run_worker(state, store, minter, config, shutdown_receiver);
            })
        };

        Self {
            store,
            config,
            next_id: AtomicU64::new(1),
            state,
            shutdown,
            worker: Some(worker),
        }
    }

    /// Allocate a fresh, strictly increasing purchase id
    ///
    /// Has no other side effect and never fails.
    pub fn reserve_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Admit a purchase request
    ///
    /// Validates the request and the wait-list capacity synchronously, then
    /// schedules the insertion into the wait-list after a randomized delay.
    /// Returns immediately with the record still in `Reserved` state; callers
    /// observe progress by polling [`Self::position()`].
    ///
    /// The capacity and inventory checks happen at call time only; the
    /// inventory is re-checked authoritatively at fulfillment.
    pub fn admit(&self, request: PurchaseRequest) -> Result<PurchaseRecord, AdmissionError> {
        if request.tickets == 0 {
            return Err(AdmissionError::InvalidTicketCount);
        }
        let remaining = self
            .store
            .remaining(request.event_id)
            .ok_or(AdmissionError::UnknownEvent(request.event_id))?;
        if remaining < request.tickets {
            return Err(AdmissionError::InsufficientInventory {
                event: request.event_id,
                remaining,
            });
        }

        let delay = self.admission_delay();
        let mut state = self.state.lock();
        if state.wait_list.len() >= self.config.capacity {
            return Err(AdmissionError::QueueFull);
        }

        let record = PurchaseRecord::new(request);
        state.records.insert(request.id, record.clone());
        state.pending.push(PendingAdmission {
            due: Instant::now() + delay,
            id: request.id,
        });
        debug!(purchase = request.id, ?delay, "purchase reserved");
        Ok(record)
    }

    /// Allocate an id and admit a purchase for `tickets` tickets to
    /// `event_id` in one step
    ///
    /// Returns the purchase id for later polling.
    pub fn submit(&self, event_id: u32, tickets: u32) -> Result<u64, AdmissionError> {
        let request = PurchaseRequest {
            id: self.reserve_id(),
            event_id,
            tickets,
        };
        self.admit(request)?;
        Ok(request.id)
    }

    /// Where a purchase currently stands
    ///
    /// Runs under the same lock as the fulfillment worker, so it never sees a
    /// purchase that is neither waiting nor completed while it is being
    /// moved.
    pub fn position(&self, id: u64) -> Position {
        let state = self.state.lock();
        if let Some(index) = state.wait_list.iter().position(|&p| p == id) {
            return Position::QueueIndex(index);
        }
        drop(state);

        match self.store.get_completed(id) {
            Some(record) => Position::Completed(record.ticket_ids),
            None => Position::Unknown,
        }
    }

    /// Remove a purchase without fulfilling it
    ///
    /// A `Waiting` purchase is taken out of the wait-list immediately. A
    /// `Reserved` purchase is marked cancelled and dropped by its admission
    /// timer before it ever reaches the wait-list. Returns whether a
    /// cancellation took effect; completed or unknown ids report `false`.
    pub fn remove(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        if let Some(index) = state.wait_list.iter().position(|&p| p == id) {
            state.wait_list.remove(index);
            state.records.remove(&id);
            info!(purchase = id, "waiting purchase cancelled");
            return true;
        }
        if let Some(record) = state.records.get_mut(&id) {
            if record.state == PurchaseState::Reserved {
                record.state = PurchaseState::Cancelled;
                info!(purchase = id, "reserved purchase cancelled");
                return true;
            }
        }
        false
    }

    /// Number of purchases currently waiting
    pub fn waiting_len(&self) -> usize {
        self.state.lock().wait_list.len()
    }

    /// The inventory store this engine fulfills against
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Shut the engine down, waiting for the worker to terminate
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.shutdown.send(());
            let _ = worker.join();
        }
    }

    /// Draw the admission delay uniformly from the configured window
    fn admission_delay(&self) -> Duration {
        let min = self.config.admission_delay_min.as_millis() as u64;
        let max = self.config.admission_delay_max.as_millis() as u64;
        if max <= min {
            return self.config.admission_delay_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Drop for QueueEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The worker's main loop: sleep one tick at a time, leaving early on
/// shutdown
fn run_worker(
    state: Arc<Mutex<EngineState>>,
    store: Arc<Store>,
    minter: Arc<TicketMinter>,
    config: Config,
    shutdown: Receiver<()>,
) {
    loop {
        match shutdown.recv_timeout(config.tick) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        tick(&state, &store, &minter, &config);
    }
    debug!("fulfillment worker stopped");
}

/// One worker tick: fire due admissions, then drain every head whose
/// residency has elapsed
fn tick(state: &Mutex<EngineState>, store: &Store, minter: &TicketMinter, config: &Config) {
    let mut guard = state.lock();
    let state = &mut *guard;
    let now = Instant::now();

    // Stage one: move due admissions into the wait-list. A record cancelled
    // during its delay is dropped here, before it can touch the wait-list.
    while state.pending.peek().is_some_and(|p| p.due <= now) {
        let Some(pending) = state.pending.pop() else {
            break;
        };
        match state.records.get(&pending.id).map(|r| r.state) {
            Some(PurchaseState::Reserved) => {
                if let Some(record) = state.records.get_mut(&pending.id) {
                    record.state = PurchaseState::Waiting;
                    record.admitted_at = Some(now);
                }
                state.wait_list.push_back(pending.id);
                debug!(purchase = pending.id, "admitted to wait-list");
            }
            Some(PurchaseState::Cancelled) => {
                state.records.remove(&pending.id);
                debug!(purchase = pending.id, "cancelled before admission");
            }
            Some(other) => {
                error!(purchase = pending.id, state = ?other, "pending admission in unexpected state");
            }
            None => {
                error!(purchase = pending.id, "pending admission without record");
            }
        }
    }

    // Stage two: fulfillment. Only the head is ever inspected; FIFO order is
    // preserved and a head short of its residency stops the drain.
    loop {
        let Some(&head) = state.wait_list.front() else {
            break;
        };
        let (request, admitted_at) = match state.records.get(&head).map(|r| (r.request, r.admitted_at)) {
            Some((request, Some(admitted_at))) => (request, admitted_at),
            Some((_, None)) => {
                error!(purchase = head, "waiting purchase without admission time");
                state.wait_list.pop_front();
                state.records.remove(&head);
                continue;
            }
            None => {
                error!(purchase = head, "waiting purchase without record");
                state.wait_list.pop_front();
                continue;
            }
        };
        if now.duration_since(admitted_at) < config.min_residency {
            break;
        }

        match store.decrement(request.event_id, request.tickets) {
            Ok(()) => {
                let Some(mut record) = state.records.remove(&head) else {
                    break;
                };
                record.ticket_ids = minter.mint(request.tickets);
                record.state = PurchaseState::Fulfilled;
                // Publish the completed record before the pop; both happen
                // under the engine lock, so observers see exactly one of
                // "waiting" or "completed".
                store.record_completed(record);
                state.wait_list.pop_front();
                info!(
                    purchase = head,
                    event = request.event_id,
                    tickets = request.tickets,
                    "purchase fulfilled"
                );
            }
            Err(err) => {
                state.wait_list.pop_front();
                state.records.remove(&head);
                warn!(purchase = head, %err, "purchase rejected at fulfillment");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::Event;

    fn test_store(remaining: u32) -> Arc<Store> {
        Arc::new(Store::new(vec![Event {
            id: 1,
            artist: "artist".into(),
            venue: "venue".into(),
            datetime: "2026-09-01T20:00".into(),
            remaining,
        }]))
    }

    // Long delays so nothing fires while the synchronous checks run.
    fn slow_config() -> Config {
        Config {
            capacity: 2,
            tick: Duration::from_millis(5),
            min_residency: Duration::from_secs(60),
            admission_delay_min: Duration::from_secs(60),
            admission_delay_max: Duration::from_secs(60),
        }
    }

    #[test]
    fn reserve_id_is_strictly_increasing() {
        let engine = QueueEngine::new(test_store(10), slow_config());
        let mut last = 0;
        for _ in 0..100 {
            let id = engine.reserve_id();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn admit_validates_synchronously() {
        let engine = QueueEngine::new(test_store(5), slow_config());

        let bad_count = PurchaseRequest {
            id: engine.reserve_id(),
            event_id: 1,
            tickets: 0,
        };
        assert_eq!(
            engine.admit(bad_count).unwrap_err(),
            AdmissionError::InvalidTicketCount
        );

        let bad_event = PurchaseRequest {
            id: engine.reserve_id(),
            event_id: 9,
            tickets: 1,
        };
        assert_eq!(
            engine.admit(bad_event).unwrap_err(),
            AdmissionError::UnknownEvent(9)
        );

        let too_many = PurchaseRequest {
            id: engine.reserve_id(),
            event_id: 1,
            tickets: 6,
        };
        assert_eq!(
            engine.admit(too_many).unwrap_err(),
            AdmissionError::InsufficientInventory {
                event: 1,
                remaining: 5,
            }
        );
    }

    #[test]
    fn reserved_purchase_is_unknown_and_cancellable() {
        let engine = QueueEngine::new(test_store(5), slow_config());
        let id = engine.submit(1, 1).unwrap();

        // still inside the admission delay
        assert_eq!(engine.position(id), Position::Unknown);
        assert!(engine.remove(id));
        assert!(!engine.remove(id), "second cancel must report false");
    }

    #[test]
    fn unknown_id_is_not_removable() {
        let engine = QueueEngine::new(test_store(5), slow_config());
        assert!(!engine.remove(42));
        assert_eq!(engine.position(42), Position::Unknown);
    }
}
