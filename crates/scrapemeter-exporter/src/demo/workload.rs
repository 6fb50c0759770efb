//! Synthetic data generator.
//!
//! Sleeps a random 0..max_sleep ms, then bumps two counters, records the
//! sleep as a histogram sample and stores a fresh random gauge value.

use std::sync::Arc;

use rand::Rng;
use tokio::time::{sleep, Duration};

use scrapemeter_core::error::Result;
use scrapemeter_core::{AttributeSet, Counter, GaugeCell, Histogram, KeyValue, Meter};

use crate::collect::CallbackScheduler;

pub struct DemoInstruments {
    counter: Counter,
    counter2: Counter,
    histogram: Histogram,
    gauge_value: Arc<GaugeCell>,
}

impl DemoInstruments {
    /// Create the demo instruments and the gauge callback.
    pub fn register(meter: &Meter, scheduler: &CallbackScheduler) -> Result<Self> {
        let counter = meter.counter("test.my_counter", "Just a test counter", "")?;
        let counter2 = meter.counter("test.my_counter2", "Just a test counter", "")?;
        let histogram = meter.histogram("test.histogram1", "Test histogram metric", "ms")?;

        let gauge_value = Arc::new(GaugeCell::default());
        let gauge = meter.async_gauge("test.gauge_observer1", "Gauge observer in bytes", "By")?;
        let cell = Arc::clone(&gauge_value);
        scheduler.register_fn(&gauge, move |obs| {
            obs.observe(cell.get(), AttributeSet::empty());
            Ok(())
        })?;

        Ok(Self {
            counter,
            counter2,
            histogram,
            gauge_value,
        })
    }

    /// Apply one synthetic event for `n` (milliseconds slept).
    pub fn emit(&self, n: u64, gauge: f64) -> Result<()> {
        let bucket = n % 5;
        self.counter.inc(&AttributeSet::from([KeyValue::string(
            "test_attr",
            format!("hello {bucket}"),
        )]))?;
        self.counter2.inc(&AttributeSet::from([
            KeyValue::string("test_attr", format!("world {bucket}")),
            KeyValue::string("test_attr2", format!("value2 {bucket}")),
        ]))?;
        self.histogram.record(
            n as f64,
            &AttributeSet::from([KeyValue::bool("test_bool1", n % 2 == 0)]),
        )?;
        self.gauge_value.set(gauge);
        Ok(())
    }

    /// Loop forever; abort the task to stop it.
    pub async fn run(self, max_sleep_ms: u64) {
        tracing::info!(max_sleep_ms, "demo workload started");
        loop {
            let (n, gauge) = {
                let mut rng = rand::thread_rng();
                (rng.gen_range(0..max_sleep_ms), rng.gen::<f64>())
            };
            sleep(Duration::from_millis(n)).await;

            if let Err(e) = self.emit(n, gauge) {
                tracing::warn!(code = e.code().as_str(), error = %e, "demo recording failed");
            }
        }
    }
}
