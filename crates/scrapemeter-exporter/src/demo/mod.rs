//! Demo workload: a handful of instruments fed with synthetic data.

pub mod runtime;
pub mod workload;

pub use runtime::register_runtime_metrics;
pub use workload::DemoInstruments;
