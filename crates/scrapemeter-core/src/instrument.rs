//! Instrument definitions and the name -> instrument registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{MeterError, Result};

const MAX_NAME_LEN: usize = 255;

// Shared by every registry so series keys never alias across meters.
static NEXT_INSTRUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Instrument kind. Part of the instrument identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Counter,
    Histogram,
    AsyncGauge,
}

impl InstrumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::Histogram => "histogram",
            InstrumentKind::AsyncGauge => "async_gauge",
        }
    }

    pub fn is_asynchronous(self) -> bool {
        matches!(self, InstrumentKind::AsyncGauge)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable instrument definition. Shared as [`InstrumentHandle`].
#[derive(Debug)]
pub struct Instrument {
    id: u64,
    name: String,
    kind: InstrumentKind,
    description: String,
    unit: String,
    boundaries: Vec<f64>,
}

impl Instrument {
    pub fn id(&self) -> u64 { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> InstrumentKind { self.kind }
    pub fn description(&self) -> &str { &self.description }
    pub fn unit(&self) -> &str { &self.unit }

    /// Histogram bucket upper bounds (empty for other kinds).
    pub fn boundaries(&self) -> &[f64] { &self.boundaries }
}

pub type InstrumentHandle = Arc<Instrument>;

/// Registration parameters for one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentSpec {
    pub name: String,
    pub kind: InstrumentKind,
    pub description: String,
    pub unit: String,
    /// Only read for histograms.
    pub boundaries: Vec<f64>,
}

impl InstrumentSpec {
    pub fn new(name: impl Into<String>, kind: InstrumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            unit: String::new(),
            boundaries: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_boundaries(mut self, boundaries: Vec<f64>) -> Self {
        self.boundaries = boundaries;
        self
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(MeterError::InvalidName("name must not be empty".into()));
    };
    if name.len() > MAX_NAME_LEN {
        return Err(MeterError::InvalidName(format!(
            "{name}: longer than {MAX_NAME_LEN} bytes"
        )));
    }
    if !first.is_ascii_alphabetic() {
        return Err(MeterError::InvalidName(format!(
            "{name}: must start with an ASCII letter"
        )));
    }
    if let Some(bad) = chars.find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'))) {
        return Err(MeterError::InvalidName(format!(
            "{name}: unexpected character {bad:?}"
        )));
    }
    Ok(())
}

pub fn validate_boundaries(boundaries: &[f64]) -> Result<()> {
    if let Some(b) = boundaries.iter().find(|b| !b.is_finite()) {
        return Err(MeterError::InvalidBoundaries(format!("{b} is not finite")));
    }
    if let Some(w) = boundaries.windows(2).find(|w| w[0] >= w[1]) {
        return Err(MeterError::InvalidBoundaries(format!(
            "must be strictly increasing ({} >= {})",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// Name -> instrument map. One definition per name.
///
/// Instrument ids are process-unique, not per registry.
#[derive(Default)]
pub struct InstrumentRegistry {
    by_name: DashMap<String, InstrumentHandle>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or fetch the identical existing) instrument.
    pub fn create_instrument(
        &self,
        name: &str,
        kind: InstrumentKind,
        description: &str,
        unit: &str,
    ) -> Result<InstrumentHandle> {
        self.create(
            InstrumentSpec::new(name, kind)
                .with_description(description)
                .with_unit(unit),
        )
    }

    pub fn create(&self, spec: InstrumentSpec) -> Result<InstrumentHandle> {
        validate_name(&spec.name)?;
        let boundaries = if spec.kind == InstrumentKind::Histogram {
            validate_boundaries(&spec.boundaries)?;
            spec.boundaries
        } else {
            Vec::new()
        };

        match self.by_name.entry(spec.name) {
            Entry::Occupied(e) => {
                let existing = e.get();
                if existing.kind != spec.kind {
                    return Err(MeterError::DuplicateDefinition {
                        name: existing.name.clone(),
                        existing: existing.kind,
                        requested: spec.kind,
                    });
                }
                if existing.description != spec.description
                    || existing.unit != spec.unit
                    || existing.boundaries != boundaries
                {
                    tracing::warn!(
                        instrument = %existing.name,
                        "instrument re-created with different metadata; keeping first definition"
                    );
                }
                Ok(Arc::clone(existing))
            }
            Entry::Vacant(e) => {
                let inst = Arc::new(Instrument {
                    id: NEXT_INSTRUMENT_ID.fetch_add(1, Ordering::Relaxed),
                    name: e.key().clone(),
                    kind: spec.kind,
                    description: spec.description,
                    unit: spec.unit,
                    boundaries,
                });
                tracing::debug!(instrument = %inst.name, kind = %inst.kind, "instrument created");
                e.insert(Arc::clone(&inst));
                Ok(inst)
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Result<InstrumentHandle> {
        self.by_name
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| MeterError::NotFound(name.to_string()))
    }

    /// True if `inst` is the handle this registry created under its name.
    pub fn owns(&self, inst: &InstrumentHandle) -> bool {
        self.by_name
            .get(inst.name())
            .is_some_and(|r| Arc::ptr_eq(r.value(), inst))
    }

    pub fn instruments(&self) -> Vec<InstrumentHandle> {
        self.by_name.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
