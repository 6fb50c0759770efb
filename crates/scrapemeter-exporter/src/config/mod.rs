//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use scrapemeter_core::error::{MeterError, Result};

pub use schema::{AggregationSection, DemoSection, ExporterSection, ScrapemeterConfig, TemporalitySetting};

pub fn load_from_file(path: &str) -> Result<ScrapemeterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MeterError::BadConfig(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

/// Like [`load_from_file`], but a missing file yields the defaults.
pub fn load_or_default(path: &str) -> Result<ScrapemeterConfig> {
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            Ok(ScrapemeterConfig::default())
        }
        Err(e) => Err(MeterError::BadConfig(format!("read config failed: {e}"))),
    }
}

pub fn load_from_str(s: &str) -> Result<ScrapemeterConfig> {
    let cfg: ScrapemeterConfig = serde_yaml::from_str(s)
        .map_err(|e| MeterError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
