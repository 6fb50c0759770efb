//! Process runtime gauges observed at collection time.

use std::time::Instant;

use scrapemeter_core::error::Result;
use scrapemeter_core::{AttributeSet, Meter};

use crate::collect::CallbackScheduler;

pub fn register_runtime_metrics(meter: &Meter, scheduler: &CallbackScheduler) -> Result<()> {
    let started = Instant::now();
    let uptime = meter.async_gauge("runtime.uptime", "Seconds since the exporter started", "s")?;
    scheduler.register_fn(&uptime, move |obs| {
        obs.observe(started.elapsed().as_secs_f64(), AttributeSet::empty());
        Ok(())
    })
}
