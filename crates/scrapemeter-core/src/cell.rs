//! Lock-free f64 cell shared between a writer and a gauge callback.

use std::sync::atomic::{AtomicU64, Ordering};

/// Single f64 stored as its bit pattern. Stores use release ordering and
/// loads use acquire ordering, so a reader never sees a torn value.
#[derive(Debug, Default)]
pub struct GaugeCell {
    bits: AtomicU64,
}

impl GaugeCell {
    pub fn new(v: f64) -> Self {
        Self { bits: AtomicU64::new(v.to_bits()) }
    }

    pub fn set(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
