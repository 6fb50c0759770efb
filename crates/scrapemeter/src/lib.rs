//! Top-level facade crate for scrapemeter.
//!
//! Re-exports the metrics core and the scrape exporter so users can depend on a single crate.

pub mod core {
    pub use scrapemeter_core::*;
}

pub mod exporter {
    pub use scrapemeter_exporter::*;
}
