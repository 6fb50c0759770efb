//! Per-series aggregation state and point-in-time snapshots.
//!
//! Series live in a sharded `DashMap` keyed by (instrument id, attribute set).
//! A recording takes the write lock of exactly one shard for the duration of
//! the update, and `entry()` makes first-writer allocation atomic: concurrent
//! first recordings of a new key land in the same series. A snapshot walks
//! the shards under their read locks and copies each series, so a copied
//! series is never half-updated.
//!
//! Under delta temporality a snapshot does not clear anything by itself; the
//! exporter calls [`AggregationStore::acknowledge`] once the snapshot has been
//! delivered, which subtracts exactly what was exported.

use std::sync::Arc;

use dashmap::DashMap;

use crate::attribute::AttributeSet;
use crate::error::{MeterError, Result};
use crate::instrument::{Instrument, InstrumentHandle, InstrumentKind};

/// How synchronous series behave across collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Temporality {
    /// Totals since process start.
    #[default]
    Cumulative,
    /// Increment since the previous acknowledged snapshot.
    Delta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPoint {
    pub boundaries: Vec<f64>,
    /// Per-bucket (non-cumulative) counts; `boundaries.len() + 1` entries, the
    /// last one being the +Inf overflow bucket.
    pub bucket_counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramPoint {
    fn new(boundaries: &[f64]) -> Self {
        Self {
            boundaries: boundaries.to_vec(),
            bucket_counts: vec![0; boundaries.len() + 1],
            sum: 0.0,
            count: 0,
        }
    }

    fn record(&mut self, v: f64) {
        // first boundary >= v; falls through to the overflow bucket
        let idx = self.boundaries.partition_point(|b| *b < v);
        self.bucket_counts[idx] += 1;
        self.sum += v;
        self.count += 1;
    }

    /// Running totals per boundary, ending with the +Inf bucket (== count).
    pub fn cumulative_counts(&self) -> Vec<u64> {
        self.bucket_counts
            .iter()
            .scan(0u64, |acc, c| {
                *acc += c;
                Some(*acc)
            })
            .collect()
    }

    fn clear(&mut self) {
        self.bucket_counts.iter_mut().for_each(|c| *c = 0);
        self.sum = 0.0;
        self.count = 0;
    }

    fn subtract(&mut self, exported: &HistogramPoint) {
        for (c, e) in self.bucket_counts.iter_mut().zip(&exported.bucket_counts) {
            *c = c.saturating_sub(*e);
        }
        self.sum -= exported.sum;
        self.count = self.count.saturating_sub(exported.count);
    }
}

/// Aggregated value of one series.
#[derive(Debug, Clone, PartialEq)]
pub enum Point {
    Sum(f64),
    Histogram(HistogramPoint),
    Gauge(f64),
}

impl Point {
    fn zero(inst: &Instrument) -> Self {
        match inst.kind() {
            InstrumentKind::Counter => Point::Sum(0.0),
            InstrumentKind::Histogram => Point::Histogram(HistogramPoint::new(inst.boundaries())),
            InstrumentKind::AsyncGauge => Point::Gauge(0.0),
        }
    }

    fn clear(&mut self) {
        match self {
            Point::Sum(s) => *s = 0.0,
            Point::Histogram(h) => h.clear(),
            Point::Gauge(_) => {}
        }
    }

    fn subtract(&mut self, exported: &Point) {
        match (self, exported) {
            (Point::Sum(s), Point::Sum(e)) => *s -= e,
            (Point::Histogram(h), Point::Histogram(e)) => h.subtract(e),
            _ => {}
        }
    }
}

struct SeriesState {
    instrument: InstrumentHandle,
    point: Point,
}

type SeriesRef<'a> = dashmap::mapref::one::RefMut<'a, (u64, AttributeSet), SeriesState>;

#[derive(Debug, Clone)]
pub struct SeriesSnapshot {
    pub attributes: AttributeSet,
    pub point: Point,
}

/// All series of one instrument, sorted by attribute set.
#[derive(Debug, Clone)]
pub struct FamilySnapshot {
    pub instrument: InstrumentHandle,
    pub series: Vec<SeriesSnapshot>,
}

/// Immutable point-in-time copy of the store.
/// Families are sorted by instrument name.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub families: Vec<FamilySnapshot>,
}

impl Snapshot {
    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.instrument.name() == name)
    }

    pub fn point(&self, name: &str, attrs: &AttributeSet) -> Option<&Point> {
        self.family(name)?
            .series
            .iter()
            .find(|s| &s.attributes == attrs)
            .map(|s| &s.point)
    }

    pub fn series_count(&self) -> usize {
        self.families.iter().map(|f| f.series.len()).sum()
    }
}

/// Accumulates measurements per (instrument, attribute set).
#[derive(Default)]
pub struct AggregationStore {
    series: DashMap<(u64, AttributeSet), SeriesState>,
    temporality: Temporality,
}

impl AggregationStore {
    pub fn new(temporality: Temporality) -> Self {
        Self {
            series: DashMap::new(),
            temporality,
        }
    }

    pub fn temporality(&self) -> Temporality {
        self.temporality
    }

    /// Apply a counter increment or a histogram observation.
    pub fn record_synchronous(&self, inst: &InstrumentHandle, attrs: &AttributeSet, value: f64) -> Result<()> {
        match inst.kind() {
            InstrumentKind::Counter => {
                if !value.is_finite() || value < 0.0 {
                    return Err(MeterError::invalid_value(
                        inst.name(),
                        format!("counter increment must be finite and non-negative, got {value}"),
                    ));
                }
            }
            InstrumentKind::Histogram => {
                if !value.is_finite() {
                    return Err(MeterError::invalid_value(
                        inst.name(),
                        format!("histogram value must be finite, got {value}"),
                    ));
                }
            }
            InstrumentKind::AsyncGauge => {
                return Err(MeterError::invalid_value(
                    inst.name(),
                    "asynchronous gauges are only recorded through callbacks",
                ));
            }
        }

        let mut state = self.entry(inst, attrs)?;
        match &mut state.point {
            Point::Sum(s) => *s += value,
            Point::Histogram(h) => h.record(value),
            Point::Gauge(_) => {
                return Err(MeterError::invalid_value(
                    inst.name(),
                    "series holds a gauge, not a synchronous aggregation",
                ))
            }
        }
        Ok(())
    }

    /// Replace the last observed value of an asynchronous gauge.
    pub fn record_asynchronous(&self, inst: &InstrumentHandle, attrs: &AttributeSet, value: f64) -> Result<()> {
        if !inst.kind().is_asynchronous() {
            return Err(MeterError::invalid_value(
                inst.name(),
                format!("{} cannot take asynchronous observations", inst.kind()),
            ));
        }
        let mut state = self.entry(inst, attrs)?;
        state.point = Point::Gauge(value);
        Ok(())
    }

    fn entry(&self, inst: &InstrumentHandle, attrs: &AttributeSet) -> Result<SeriesRef<'_>> {
        let key = (inst.id(), attrs.clone());
        let state = self.series.entry(key).or_insert_with(|| SeriesState {
            instrument: Arc::clone(inst),
            point: Point::zero(inst),
        });
        if !Arc::ptr_eq(&state.instrument, inst) {
            return Err(MeterError::invalid_value(
                inst.name(),
                format!("series id {} belongs to instrument {}", inst.id(), state.instrument.name()),
            ));
        }
        Ok(state)
    }

    /// Copy every series. Nothing is cleared; see [`AggregationStore::acknowledge`].
    pub fn snapshot(&self) -> Snapshot {
        let mut rows: Vec<(InstrumentHandle, AttributeSet, Point)> = Vec::with_capacity(self.series.len());
        for r in self.series.iter() {
            let state = r.value();
            rows.push((Arc::clone(&state.instrument), r.key().1.clone(), state.point.clone()));
        }

        rows.sort_by(|a, b| {
            a.0.name()
                .cmp(b.0.name())
                .then_with(|| a.1.cmp(&b.1))
        });

        let mut families: Vec<FamilySnapshot> = Vec::new();
        for (instrument, attributes, point) in rows {
            let series = SeriesSnapshot { attributes, point };
            match families.last_mut() {
                Some(f) if f.instrument.id() == instrument.id() => f.series.push(series),
                _ => families.push(FamilySnapshot {
                    instrument,
                    series: vec![series],
                }),
            }
        }
        Snapshot { families }
    }

    /// Mark `exported` as delivered. Under delta temporality the exported
    /// amounts are subtracted from the live series, so recordings made after
    /// the snapshot was taken carry over to the next one. No-op for
    /// cumulative stores.
    pub fn acknowledge(&self, exported: &Snapshot) {
        if self.temporality == Temporality::Cumulative {
            return;
        }
        for family in &exported.families {
            for s in &family.series {
                let key = (family.instrument.id(), s.attributes.clone());
                if let Some(mut state) = self.series.get_mut(&key) {
                    if Arc::ptr_eq(&state.instrument, &family.instrument) {
                        state.point.subtract(&s.point);
                    }
                }
            }
        }
    }

    /// Zero all counter and histogram series.
    pub fn reset(&self) {
        for mut r in self.series.iter_mut() {
            r.value_mut().point.clear();
        }
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }
}
