//! Collection cycle: observation callbacks, snapshot, encoding.
//!
//! Re-exports the scheduler and collector so downstream consumers can
//! depend on this module directly.

pub mod collector;
pub mod scheduler;

pub use collector::Collector;
pub use scheduler::{Callback, CallbackScheduler, CycleReport, FnCallback, Observer};
