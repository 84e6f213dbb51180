//! Infrastructure shared between the queue engine and the HTTP shell:
//! the transport-agnostic request abstraction and the system configuration.
#![warn(missing_docs)]

use std::time::Duration;

mod request;

pub use request::{RawRequest, Request, RequestHandler, RequestKind, RequestMethod};

/// Configuration of the box-office queueing system
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Maximum number of purchases allowed in the wait-list at once
    pub capacity: usize,
    /// Interval at which the fulfillment worker wakes up
    pub tick: Duration,
    /// Time a purchase must sit at the head of the wait-list before it is
    /// fulfilled
    pub min_residency: Duration,
    /// Lower bound of the randomized admission delay
    pub admission_delay_min: Duration,
    /// Upper bound (inclusive) of the randomized admission delay
    pub admission_delay_max: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 128,
            tick: Duration::from_secs(1),
            min_residency: Duration::from_secs(10),
            admission_delay_min: Duration::from_secs(5),
            admission_delay_max: Duration::from_secs(10),
        }
    }
}
