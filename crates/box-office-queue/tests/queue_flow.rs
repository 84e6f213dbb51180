//! End-to-end engine behavior: admission, residency, fulfillment, positions.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use box_office_queue::{AdmissionError, Position, QueueEngine};
use eyre::Result;

mod util;
use util::{fast_config, store_with, wait_until};

#[test]
#[ntest::timeout(10_000)]
fn reserved_ids_are_unique_across_threads() {
    let engine = Arc::new(QueueEngine::new(store_with(vec![(1, 10)]), fast_config()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || (0..200).map(|_| engine.reserve_id()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "id {id} was handed out twice");
        }
    }
    assert_eq!(seen.len(), 1600);
}

#[test]
#[ntest::timeout(10_000)]
fn purchase_is_fulfilled_after_both_delays() -> Result<()> {
    let store = store_with(vec![(1, 5)]);
    let engine = QueueEngine::new(store.clone(), fast_config());

    let id = engine.submit(1, 3)?;
    // invisible until the admission delay fires
    assert_eq!(engine.position(id), Position::Unknown);

    assert!(wait_until(Duration::from_secs(2), || matches!(
        engine.position(id),
        Position::Completed(_)
    )));

    let Position::Completed(tickets) = engine.position(id) else {
        panic!("purchase must stay completed");
    };
    assert_eq!(tickets.len(), 3);
    assert_eq!(store.remaining(1), Some(2));
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn fulfillment_refuses_to_oversell() -> Result<()> {
    let store = store_with(vec![(1, 5)]);
    let mut config = fast_config();
    config.min_residency = Duration::from_millis(150);
    let engine = QueueEngine::new(store.clone(), config);

    // Both pass the best-effort admission check while 5 tickets remain; the
    // authoritative check happens at fulfillment, where only 2 are left.
    let first = engine.submit(1, 3)?;
    assert!(wait_until(Duration::from_secs(2), || matches!(
        engine.position(first),
        Position::QueueIndex(_)
    )));
    let second = engine.submit(1, 4)?;

    assert!(wait_until(Duration::from_secs(2), || matches!(
        engine.position(first),
        Position::Completed(_)
    )));

    // the second purchase is rejected, never completed, inventory untouched
    assert!(wait_until(Duration::from_secs(2), || engine.waiting_len() == 0
        && engine.position(second) == Position::Unknown));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(engine.position(second), Position::Unknown);
    assert_eq!(store.remaining(1), Some(2));
    Ok(())
}

#[test]
#[ntest::timeout(20_000)]
fn positions_advance_in_fifo_order() -> Result<()> {
    let mut config = fast_config();
    // long residency so all three are observably queued together
    config.min_residency = Duration::from_millis(400);
    let engine = QueueEngine::new(store_with(vec![(1, 10)]), config);

    let mut ids = Vec::new();
    for n in 0..3 {
        let id = engine.submit(1, 1)?;
        // serialize admissions so arrival order is deterministic, and space
        // them out so consecutive heads become eligible in different ticks
        assert!(wait_until(Duration::from_secs(2), || matches!(
            engine.position(id),
            Position::QueueIndex(_)
        )));
        if n < 2 {
            std::thread::sleep(Duration::from_millis(60));
        }
        ids.push(id);
    }

    assert_eq!(engine.position(ids[0]), Position::QueueIndex(0));
    assert_eq!(engine.position(ids[1]), Position::QueueIndex(1));
    assert_eq!(engine.position(ids[2]), Position::QueueIndex(2));

    // after the two ahead are fulfilled, the last moves to the head
    assert!(wait_until(Duration::from_secs(5), || {
        matches!(engine.position(ids[1]), Position::Completed(_))
    }));
    assert_eq!(engine.position(ids[2]), Position::QueueIndex(0));

    assert!(wait_until(Duration::from_secs(5), || matches!(
        engine.position(ids[2]),
        Position::Completed(_)
    )));
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn admission_is_refused_at_capacity() -> Result<()> {
    let mut config = fast_config();
    config.capacity = 3;
    // effectively never fulfill
    config.min_residency = Duration::from_secs(600);
    let store = store_with(vec![(1, 100)]);
    let engine = QueueEngine::new(store.clone(), config);

    for _ in 0..3 {
        engine.submit(1, 1)?;
    }
    assert!(wait_until(Duration::from_secs(2), || engine.waiting_len() == 3));

    let before = store.remaining(1);
    assert_eq!(engine.submit(1, 1).unwrap_err(), AdmissionError::QueueFull);
    assert_eq!(store.remaining(1), before, "a refused admission must not touch inventory");
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn inventory_is_decremented_exactly_once_under_polling() -> Result<()> {
    let store = store_with(vec![(1, 8)]);
    let engine = Arc::new(QueueEngine::new(store.clone(), fast_config()));
    let id = engine.submit(1, 2)?;

    // hammer position() from several threads while the worker fulfills
    let pollers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                while !matches!(engine.position(id), Position::Completed(_)) {
                    std::thread::yield_now();
                }
            })
        })
        .collect();
    for poller in pollers {
        poller.join().unwrap();
    }

    assert_eq!(store.remaining(1), Some(6));
    // a few more ticks must not decrement again
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(store.remaining(1), Some(6));
    Ok(())
}
