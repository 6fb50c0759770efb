use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::time::{timeout_at, Duration, Instant};

use scrapemeter_core::error::{MeterError, Result};
use scrapemeter_core::{AsyncGauge, AttributeSet, InstrumentHandle, Meter};

/// Observation callback for one asynchronous instrument.
#[async_trait]
pub trait Callback: Send + Sync {
    async fn observe(&self, obs: &mut Observer) -> Result<()>;
}

/// Adapter for plain synchronous closures.
pub struct FnCallback<F>(pub F);

#[async_trait]
impl<F> Callback for FnCallback<F>
where
    F: Fn(&mut Observer) -> Result<()> + Send + Sync,
{
    async fn observe(&self, obs: &mut Observer) -> Result<()> {
        (self.0)(obs)
    }
}

/// Collects one callback run's observations. Nothing reaches the store until
/// the callback has returned `Ok` within the cycle deadline.
pub struct Observer {
    instrument: InstrumentHandle,
    points: Vec<(AttributeSet, f64)>,
}

impl Observer {
    fn new(instrument: InstrumentHandle) -> Self {
        Self { instrument, points: Vec::new() }
    }

    pub fn observe(&mut self, value: f64, attrs: AttributeSet) {
        self.points.push((attrs, value));
    }

    pub fn instrument(&self) -> &InstrumentHandle {
        &self.instrument
    }

    /// Nothing is committed once the meter is shut down.
    fn commit(self, meter: &Meter) -> Result<usize> {
        if meter.is_shut_down() {
            tracing::debug!(instrument = %self.instrument.name(), "observations dropped after shutdown");
            return Ok(0);
        }
        let n = self.points.len();
        for (attrs, v) in &self.points {
            meter.observe(&self.instrument, attrs, *v)?;
        }
        Ok(n)
    }
}

#[derive(Clone)]
struct Registration {
    instrument: InstrumentHandle,
    callback: Arc<dyn Callback>,
}

/// Outcome of one `run_all` pass.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Callbacks that completed and were committed.
    pub completed: usize,
    /// Observations committed to the store.
    pub observations: usize,
    /// Failed or timed-out callbacks; their gauges keep the previous value.
    pub errors: Vec<MeterError>,
}

/// One callback per asynchronous instrument, run once per collection cycle.
#[derive(Default)]
pub struct CallbackScheduler {
    callbacks: DashMap<u64, Registration>,
}

impl CallbackScheduler {
    pub fn new() -> Self {
        Self { callbacks: DashMap::new() }
    }

    pub fn register(&self, instrument: &InstrumentHandle, callback: Arc<dyn Callback>) -> Result<()> {
        if !instrument.kind().is_asynchronous() {
            return Err(MeterError::NotAsynchronous(instrument.name().to_string()));
        }
        match self.callbacks.entry(instrument.id()) {
            Entry::Occupied(_) => Err(MeterError::DuplicateCallback(instrument.name().to_string())),
            Entry::Vacant(e) => {
                e.insert(Registration {
                    instrument: Arc::clone(instrument),
                    callback,
                });
                Ok(())
            }
        }
    }

    pub fn register_gauge(&self, gauge: &AsyncGauge, callback: Arc<dyn Callback>) -> Result<()> {
        self.register(gauge.instrument(), callback)
    }

    /// Convenience for synchronous closures.
    pub fn register_fn<F>(&self, gauge: &AsyncGauge, f: F) -> Result<()>
    where
        F: Fn(&mut Observer) -> Result<()> + Send + Sync + 'static,
    {
        self.register(gauge.instrument(), Arc::new(FnCallback(f)))
    }

    pub fn unregister(&self, instrument: &InstrumentHandle) -> bool {
        self.callbacks.remove(&instrument.id()).is_some()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Run every callback once, concurrently, and commit the ones that finish
    /// before `timeout` elapses.
    ///
    /// Dropping the returned future discards uncommitted observations; each
    /// commit happens without an await point, so a cancelled cycle never
    /// leaves a callback's observations half-applied.
    pub async fn run_all(&self, meter: &Meter, timeout: Duration) -> CycleReport {
        // no map guard may be held across the awaits below
        let regs: Vec<Registration> = self.callbacks.iter().map(|e| e.value().clone()).collect();
        let deadline = Instant::now() + timeout;

        let mut futs = FuturesUnordered::new();
        for reg in regs {
            futs.push(async move {
                let mut obs = Observer::new(Arc::clone(&reg.instrument));
                let res = timeout_at(deadline, reg.callback.observe(&mut obs)).await;
                (reg.instrument, obs, res)
            });
        }

        let mut report = CycleReport::default();
        while let Some((inst, obs, res)) = futs.next().await {
            let err = match res {
                Ok(Ok(())) => match obs.commit(meter) {
                    Ok(n) => {
                        report.completed += 1;
                        report.observations += n;
                        continue;
                    }
                    Err(e) => e,
                },
                Ok(Err(e)) => MeterError::Callback {
                    instrument: inst.name().to_string(),
                    reason: e.to_string(),
                },
                Err(_elapsed) => MeterError::CallbackTimeout {
                    instrument: inst.name().to_string(),
                },
            };
            tracing::warn!(
                instrument = %inst.name(),
                code = err.code().as_str(),
                error = %err,
                "observation callback failed; keeping previous value"
            );
            report.errors.push(err);
        }
        report
    }
}
