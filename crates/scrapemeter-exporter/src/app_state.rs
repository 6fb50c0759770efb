//! Shared application state for the scrape exporter.
//!
//! Owns the meter, the callback scheduler and the collector. Startup errors
//! are explicit (Result instead of panic).

use std::sync::Arc;

use tokio::time::Duration;

use scrapemeter_core::error::Result;
use scrapemeter_core::Meter;

use crate::collect::{CallbackScheduler, Collector};
use crate::config::ScrapemeterConfig;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    collector: Arc<Collector>,
}

struct AppStateInner {
    cfg: ScrapemeterConfig,
    meter: Meter,
    scheduler: Arc<CallbackScheduler>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: ScrapemeterConfig) -> Result<Self> {
        cfg.validate()?;
        let meter = Meter::new(cfg.meter_config())?;
        let scheduler = Arc::new(CallbackScheduler::new());
        let collector = Collector::new(
            meter.clone(),
            Arc::clone(&scheduler),
            Duration::from_millis(cfg.exporter.callback_timeout_ms),
        )
        .with_encoder(cfg.exporter.encoder());

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, meter, scheduler }),
            collector: Arc::new(collector),
        })
    }

    pub fn cfg(&self) -> &ScrapemeterConfig {
        &self.inner.cfg
    }

    pub fn meter(&self) -> &Meter {
        &self.inner.meter
    }

    pub fn scheduler(&self) -> Arc<CallbackScheduler> {
        Arc::clone(&self.inner.scheduler)
    }

    pub fn collector(&self) -> Arc<Collector> {
        Arc::clone(&self.collector)
    }
}
