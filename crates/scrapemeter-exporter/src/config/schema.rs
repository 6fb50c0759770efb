use std::net::SocketAddr;

use serde::Deserialize;
use scrapemeter_core::error::{MeterError, Result};
use scrapemeter_core::instrument::validate_boundaries;
use scrapemeter_core::meter::{MeterConfig, DEFAULT_BOUNDARIES};
use scrapemeter_core::{Temporality, TextEncoder};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapemeterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub aggregation: AggregationSection,

    #[serde(default)]
    pub demo: DemoSection,
}

impl Default for ScrapemeterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ExporterSection::default(),
            aggregation: AggregationSection::default(),
            demo: DemoSection::default(),
        }
    }
}

impl ScrapemeterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MeterError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.exporter.validate()?;
        self.aggregation.validate()?;
        self.demo.validate()?;

        Ok(())
    }

    pub fn meter_config(&self) -> MeterConfig {
        MeterConfig {
            temporality: self.aggregation.temporality.into(),
            default_boundaries: self.aggregation.default_boundaries.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_callback_timeout_ms")]
    pub callback_timeout_ms: u64,

    /// Fail the scrape (500) instead of skipping series Prometheus would reject.
    #[serde(default)]
    pub strict_encoding: bool,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            callback_timeout_ms: default_callback_timeout_ms(),
            strict_encoding: false,
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !self.path.starts_with('/') || self.path.len() < 2 {
            return Err(MeterError::BadConfig(
                "exporter.path must start with '/' and name a route".into(),
            ));
        }
        if self.path == "/healthz" {
            return Err(MeterError::BadConfig(
                "exporter.path must not shadow /healthz".into(),
            ));
        }
        if !(1..=60000).contains(&self.callback_timeout_ms) {
            return Err(MeterError::BadConfig(
                "exporter.callback_timeout_ms must be between 1 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn encoder(&self) -> TextEncoder {
        if self.strict_encoding {
            TextEncoder::strict()
        } else {
            TextEncoder::new()
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            MeterError::BadConfig(format!("exporter.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8088".into()
}
fn default_path() -> String {
    "/metrics".into()
}
fn default_callback_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemporalitySetting {
    #[default]
    Cumulative,
    Delta,
}

impl From<TemporalitySetting> for Temporality {
    fn from(t: TemporalitySetting) -> Self {
        match t {
            TemporalitySetting::Cumulative => Temporality::Cumulative,
            TemporalitySetting::Delta => Temporality::Delta,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregationSection {
    #[serde(default)]
    pub temporality: TemporalitySetting,

    #[serde(default = "default_boundaries")]
    pub default_boundaries: Vec<f64>,
}

impl Default for AggregationSection {
    fn default() -> Self {
        Self {
            temporality: TemporalitySetting::default(),
            default_boundaries: default_boundaries(),
        }
    }
}

impl AggregationSection {
    pub fn validate(&self) -> Result<()> {
        if self.default_boundaries.is_empty() {
            return Err(MeterError::BadConfig(
                "aggregation.default_boundaries must not be empty".into(),
            ));
        }
        validate_boundaries(&self.default_boundaries)
            .map_err(|e| MeterError::BadConfig(format!("aggregation.default_boundaries: {e}")))
    }
}

fn default_boundaries() -> Vec<f64> {
    DEFAULT_BOUNDARIES.to_vec()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoSection {
    #[serde(default = "default_demo_enabled")]
    pub enabled: bool,

    #[serde(default = "default_max_sleep_ms")]
    pub max_sleep_ms: u64,
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            enabled: default_demo_enabled(),
            max_sleep_ms: default_max_sleep_ms(),
        }
    }
}

impl DemoSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=60000).contains(&self.max_sleep_ms) {
            return Err(MeterError::BadConfig(
                "demo.max_sleep_ms must be between 1 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_demo_enabled() -> bool {
    true
}
fn default_max_sleep_ms() -> u64 {
    1000
}
