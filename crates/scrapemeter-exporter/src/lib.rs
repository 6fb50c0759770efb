//! scrapemeter exporter library entry.
//!
//! This crate wires the metrics core to an HTTP scrape endpoint: callback
//! scheduling, serialized collection cycles, strict YAML config, the axum
//! router and the demo workload. It is intended to be consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod collect;
pub mod config;
pub mod demo;
pub mod ops;
pub mod router;
