use std::sync::Arc;
use std::time::Duration;

use box_office_core::Config;
use box_office_queue::{Event, Store};

/// Millisecond-scale configuration so the two timing stages elapse quickly.
///
/// The admission delay window plus one tick stays well below `min_residency`,
/// so purchases submitted one stage apart keep their order.
#[allow(unused)]
pub fn fast_config() -> Config {
    Config {
        capacity: 128,
        tick: Duration::from_millis(5),
        min_residency: Duration::from_millis(60),
        admission_delay_min: Duration::from_millis(5),
        admission_delay_max: Duration::from_millis(10),
    }
}

#[allow(unused)]
pub fn store_with(events: Vec<(u32, u32)>) -> Arc<Store> {
    Arc::new(Store::new(
        events
            .into_iter()
            .map(|(id, remaining)| Event {
                id,
                artist: format!("artist-{id}"),
                venue: "venue".into(),
                datetime: "2026-09-01T20:00".into(),
                remaining,
            })
            .collect(),
    ))
}

/// Poll `cond` every couple of milliseconds until it holds or `timeout`
/// passes.
#[allow(unused)]
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    loop {
        if cond() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
