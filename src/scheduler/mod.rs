//! Search timeout scheduler module.
//!
//! Periodically sweeps the pairing pool: warns users who have waited a while,
//! times out searches past the configured limit and expires stale reveal
//! requests.

mod runner;

pub use runner::{SchedulerMessage, TimeoutScheduler};
