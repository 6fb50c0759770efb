//! Meter: explicitly constructed entry point owning the registry and store.
//!
//! There is no process-wide meter; construct one at startup and share it
//! through `Arc`. After [`Meter::shutdown`] new instruments are refused and
//! both synchronous recordings and callback observations are dropped, while
//! snapshots keep working for a final scrape.
//!
//! Recording goes through handles this meter created; a handle from another
//! meter is rejected with `NotFound`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::aggregation::{AggregationStore, Snapshot, Temporality};
use crate::attribute::AttributeSet;
use crate::error::{MeterError, Result};
use crate::instrument::{InstrumentHandle, InstrumentKind, InstrumentRegistry, InstrumentSpec};

/// Default histogram boundaries.
pub const DEFAULT_BOUNDARIES: [f64; 15] = [
    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0, 10000.0,
];

#[derive(Debug, Clone)]
pub struct MeterConfig {
    pub temporality: Temporality,
    pub default_boundaries: Vec<f64>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            temporality: Temporality::Cumulative,
            default_boundaries: DEFAULT_BOUNDARIES.to_vec(),
        }
    }
}

struct MeterInner {
    registry: InstrumentRegistry,
    store: AggregationStore,
    default_boundaries: Vec<f64>,
    shut_down: AtomicBool,
}

#[derive(Clone)]
pub struct Meter {
    inner: Arc<MeterInner>,
}

impl Meter {
    pub fn new(cfg: MeterConfig) -> Result<Self> {
        crate::instrument::validate_boundaries(&cfg.default_boundaries)?;
        Ok(Self {
            inner: Arc::new(MeterInner {
                registry: InstrumentRegistry::new(),
                store: AggregationStore::new(cfg.temporality),
                default_boundaries: cfg.default_boundaries,
                shut_down: AtomicBool::new(false),
            }),
        })
    }

    pub fn registry(&self) -> &InstrumentRegistry { &self.inner.registry }
    pub fn store(&self) -> &AggregationStore { &self.inner.store }
    pub fn default_boundaries(&self) -> &[f64] { &self.inner.default_boundaries }

    /// Register an instrument. Histograms without explicit boundaries get the defaults.
    pub fn create_instrument(&self, mut spec: InstrumentSpec) -> Result<InstrumentHandle> {
        if self.is_shut_down() {
            return Err(MeterError::ShutDown);
        }
        if spec.kind == InstrumentKind::Histogram && spec.boundaries.is_empty() {
            spec.boundaries = self.inner.default_boundaries.clone();
        }
        self.inner.registry.create(spec)
    }

    pub fn counter(&self, name: &str, description: &str, unit: &str) -> Result<Counter> {
        let inst = self.create_instrument(
            InstrumentSpec::new(name, InstrumentKind::Counter)
                .with_description(description)
                .with_unit(unit),
        )?;
        Ok(Counter { inst, meter: self.clone() })
    }

    pub fn histogram(&self, name: &str, description: &str, unit: &str) -> Result<Histogram> {
        self.histogram_with_boundaries(name, description, unit, Vec::new())
    }

    /// Empty `boundaries` means the meter defaults.
    pub fn histogram_with_boundaries(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        boundaries: Vec<f64>,
    ) -> Result<Histogram> {
        let inst = self.create_instrument(
            InstrumentSpec::new(name, InstrumentKind::Histogram)
                .with_description(description)
                .with_unit(unit)
                .with_boundaries(boundaries),
        )?;
        Ok(Histogram { inst, meter: self.clone() })
    }

    pub fn async_gauge(&self, name: &str, description: &str, unit: &str) -> Result<AsyncGauge> {
        let inst = self.create_instrument(
            InstrumentSpec::new(name, InstrumentKind::AsyncGauge)
                .with_description(description)
                .with_unit(unit),
        )?;
        Ok(AsyncGauge { inst })
    }

    pub fn lookup(&self, name: &str) -> Result<InstrumentHandle> {
        self.inner.registry.lookup(name)
    }

    /// Synchronous recording by instrument handle.
    /// Dropped (Ok) after shutdown.
    pub fn record(&self, inst: &InstrumentHandle, attrs: &AttributeSet, value: f64) -> Result<()> {
        if self.is_shut_down() {
            tracing::debug!(instrument = %inst.name(), "recording dropped after shutdown");
            return Ok(());
        }
        self.check_owned(inst)?;
        self.inner.store.record_synchronous(inst, attrs, value)
    }

    /// Asynchronous observation, normally committed by a collection cycle.
    /// Dropped (Ok) after shutdown.
    pub fn observe(&self, inst: &InstrumentHandle, attrs: &AttributeSet, value: f64) -> Result<()> {
        if self.is_shut_down() {
            tracing::debug!(instrument = %inst.name(), "observation dropped after shutdown");
            return Ok(());
        }
        self.check_owned(inst)?;
        self.inner.store.record_asynchronous(inst, attrs, value)
    }

    fn check_owned(&self, inst: &InstrumentHandle) -> Result<()> {
        if self.inner.registry.owns(inst) {
            Ok(())
        } else {
            Err(MeterError::NotFound(format!(
                "{} (handle belongs to another meter)",
                inst.name()
            )))
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.store.snapshot()
    }

    /// See [`AggregationStore::acknowledge`].
    pub fn acknowledge(&self, exported: &Snapshot) {
        self.inner.store.acknowledge(exported)
    }

    pub fn shutdown(&self) {
        if !self.inner.shut_down.swap(true, Ordering::AcqRel) {
            tracing::info!(
                instruments = self.inner.registry.len(),
                series = self.inner.store.series_count(),
                "meter shut down"
            );
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }
}

/// Monotonic sum.
#[derive(Clone)]
pub struct Counter {
    inst: InstrumentHandle,
    meter: Meter,
}

impl Counter {
    pub fn add(&self, value: f64, attrs: &AttributeSet) -> Result<()> {
        self.meter.record(&self.inst, attrs, value)
    }

    pub fn inc(&self, attrs: &AttributeSet) -> Result<()> {
        self.add(1.0, attrs)
    }

    pub fn instrument(&self) -> &InstrumentHandle { &self.inst }
}

/// Bucketed distribution with fixed boundaries.
#[derive(Clone)]
pub struct Histogram {
    inst: InstrumentHandle,
    meter: Meter,
}

impl Histogram {
    pub fn record(&self, value: f64, attrs: &AttributeSet) -> Result<()> {
        self.meter.record(&self.inst, attrs, value)
    }

    pub fn instrument(&self) -> &InstrumentHandle { &self.inst }
}

/// Handle for a gauge observed through a callback at collection time.
#[derive(Clone)]
pub struct AsyncGauge {
    inst: InstrumentHandle,
}

impl AsyncGauge {
    pub fn instrument(&self) -> &InstrumentHandle { &self.inst }
}
