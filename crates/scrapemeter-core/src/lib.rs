//! scrapemeter core: instruments, aggregation, and text exposition.
//!
//! This crate owns the in-memory metrics model: the instrument registry, the
//! per-series aggregation store and the Prometheus text encoder. It carries
//! no async runtime or HTTP dependencies; callback scheduling and the scrape
//! server live in `scrapemeter-exporter`.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Misconfiguration and bad measurements surface as `MeterError`/`Result`
//! so the embedding application decides whether to abort.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod aggregation;
pub mod attribute;
pub mod cell;
pub mod encoding;
pub mod error;
pub mod instrument;
pub mod meter;

/// Shared result type.
pub use error::{ErrorCode, MeterError, Result};

pub use aggregation::{AggregationStore, Point, Snapshot, Temporality};
pub use attribute::{AttributeSet, KeyValue, Value};
pub use cell::GaugeCell;
pub use encoding::TextEncoder;
pub use instrument::{InstrumentHandle, InstrumentKind, InstrumentRegistry, InstrumentSpec};
pub use meter::{AsyncGauge, Counter, Histogram, Meter, MeterConfig};
