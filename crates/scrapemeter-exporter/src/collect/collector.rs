use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::time::Duration;

use scrapemeter_core::error::Result;
use scrapemeter_core::{Meter, Snapshot, TextEncoder};

use super::scheduler::{CallbackScheduler, CycleReport};

/// Runs full collection cycles for one exporter.
///
/// Cycles are serialized: overlapping scrapes queue on `cycle` and each gets
/// its own callback run and snapshot. A snapshot is acknowledged to the meter
/// only after it encoded successfully, so a failed scrape loses no delta.
pub struct Collector {
    meter: Meter,
    scheduler: Arc<CallbackScheduler>,
    encoder: TextEncoder,
    callback_timeout: Duration,
    cycle: Mutex<()>,
}

impl Collector {
    pub fn new(meter: Meter, scheduler: Arc<CallbackScheduler>, callback_timeout: Duration) -> Self {
        Self {
            meter,
            scheduler,
            encoder: TextEncoder::new(),
            callback_timeout,
            cycle: Mutex::new(()),
        }
    }

    pub fn with_encoder(mut self, encoder: TextEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Run callbacks then take a snapshot.
    pub async fn collect_snapshot(&self) -> (Snapshot, CycleReport) {
        let _cycle = self.cycle.lock().await;
        self.collect_locked().await
    }

    async fn collect_locked(&self) -> (Snapshot, CycleReport) {
        let report = self.scheduler.run_all(&self.meter, self.callback_timeout).await;
        let snapshot = self.meter.snapshot();
        tracing::debug!(
            callbacks = report.completed,
            failed = report.errors.len(),
            series = snapshot.series_count(),
            "collection cycle complete"
        );
        (snapshot, report)
    }

    /// Full cycle ending in the encoded exposition body.
    pub async fn collect(&self) -> Result<Bytes> {
        let _cycle = self.cycle.lock().await;
        let (snapshot, _report) = self.collect_locked().await;
        let body = self.encoder.encode(&snapshot)?;
        self.meter.acknowledge(&snapshot);
        Ok(body)
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    pub fn scheduler(&self) -> &Arc<CallbackScheduler> {
        &self.scheduler
    }
}
