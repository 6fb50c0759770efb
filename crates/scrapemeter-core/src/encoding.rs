//! Prometheus text exposition format (0.0.4).
//!
//! Output order follows the snapshot (instrument name, then attribute set),
//! so encoding the same snapshot twice yields identical bytes. Series that
//! cannot be represented are skipped with a warning instead of failing the
//! whole scrape, unless the encoder is strict.

use std::collections::HashSet;
use std::fmt::Write;

use bytes::Bytes;

use crate::aggregation::{FamilySnapshot, HistogramPoint, Point, Snapshot};
use crate::attribute::AttributeSet;
use crate::error::{MeterError, Result};
use crate::instrument::InstrumentKind;

/// Content type for scrape responses.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Replace characters outside `[a-zA-Z0-9_:]` with `_`; prefix a leading digit.
pub fn sanitize_metric_name(name: &str) -> String {
    sanitize(name, true)
}

/// Replace characters outside `[a-zA-Z0-9_]` with `_`; prefix a leading digit.
pub fn sanitize_label_key(key: &str) -> String {
    sanitize(key, false)
}

fn sanitize(s: &str, allow_colon: bool) -> String {
    let mut out = String::with_capacity(s.len() + 1);
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':') {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Integral values print without a fraction; infinities use the `+Inf` spelling.
pub fn format_value(v: f64) -> String {
    if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else if v.is_nan() {
        "NaN".into()
    } else {
        // Display never uses exponent notation and drops a trailing ".0"
        format!("{v}")
    }
}

/// Rendered `key="value"` pairs, or why the set cannot be exposed.
fn label_pairs(attrs: &AttributeSet, kind: InstrumentKind) -> std::result::Result<Vec<String>, String> {
    let mut keys: HashSet<String> = HashSet::with_capacity(attrs.len());
    let mut pairs = Vec::with_capacity(attrs.len());
    for kv in attrs.iter() {
        let key = sanitize_label_key(&kv.key);
        if kind == InstrumentKind::Histogram && key == "le" {
            return Err(format!("attribute {:?} clashes with the bucket label", kv.key));
        }
        if !keys.insert(key.clone()) {
            return Err(format!("attribute {:?} sanitizes to duplicate label {key}", kv.key));
        }
        pairs.push(format!("{}=\"{}\"", key, escape_label(&kv.value.to_string())));
    }
    Ok(pairs)
}

fn braces(pairs: &[String]) -> String {
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

/// Snapshot to exposition text.
///
/// The default encoder skips what Prometheus would reject (colliding names,
/// duplicate label sets, NaN samples) with a warning. A strict encoder fails
/// the whole encode instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextEncoder {
    strict: bool,
}

impl TextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn encode(&self, snapshot: &Snapshot) -> Result<Bytes> {
        let mut out = String::new();
        let mut seen: HashSet<String> = HashSet::new();

        for family in &snapshot.families {
            let name = sanitize_metric_name(family.instrument.name());
            if !seen.insert(name.clone()) {
                self.reject(
                    &name,
                    "",
                    format!(
                        "instrument {} collides with an earlier instrument after sanitizing",
                        family.instrument.name()
                    ),
                )?;
                continue;
            }
            self.encode_family(&name, family, &mut out)?;
        }
        Ok(Bytes::from(out))
    }

    /// Skip with a warning, or fail when strict.
    fn reject(&self, metric: &str, labels: &str, reason: String) -> Result<()> {
        if self.strict {
            return Err(MeterError::Encode(format!("{metric}{labels}: {reason}")));
        }
        tracing::warn!(metric = %metric, labels = %labels, reason = %reason, "series skipped");
        Ok(())
    }

    fn encode_family(&self, name: &str, family: &FamilySnapshot, out: &mut String) -> Result<()> {
        let inst = &family.instrument;
        if !inst.description().is_empty() {
            writeln!(out, "# HELP {} {}", name, escape_help(inst.description()))?;
        }
        let ty = match inst.kind() {
            InstrumentKind::Counter => "counter",
            InstrumentKind::Histogram => "histogram",
            InstrumentKind::AsyncGauge => "gauge",
        };
        writeln!(out, "# TYPE {} {}", name, ty)?;

        // label sets already written; typed values can render identically
        let mut rendered: HashSet<String> = HashSet::with_capacity(family.series.len());
        for s in &family.series {
            let labels = match label_pairs(&s.attributes, inst.kind()) {
                Ok(pairs) => pairs,
                Err(reason) => {
                    self.reject(name, "", reason)?;
                    continue;
                }
            };
            let label_text = braces(&labels);
            if rendered.contains(&label_text) {
                self.reject(name, &label_text, "label set duplicates an earlier series".into())?;
                continue;
            }
            let sample = match &s.point {
                Point::Sum(v) | Point::Gauge(v) => *v,
                Point::Histogram(h) => h.sum,
            };
            if sample.is_nan() {
                self.reject(name, &label_text, "NaN sample".into())?;
                continue;
            }
            match &s.point {
                Point::Sum(v) | Point::Gauge(v) => {
                    writeln!(out, "{}{} {}", name, label_text, format_value(*v))?
                }
                Point::Histogram(h) => encode_histogram(name, &labels, h, out)?,
            }
            rendered.insert(label_text);
        }
        Ok(())
    }
}

fn encode_histogram(name: &str, labels: &[String], h: &HistogramPoint, out: &mut String) -> std::fmt::Result {
    let cumulative = h.cumulative_counts();
    let les = h.boundaries.iter().map(|b| format_value(*b)).chain(std::iter::once("+Inf".to_string()));

    for (le, count) in les.zip(cumulative) {
        let mut pairs = labels.to_vec();
        pairs.push(format!("le=\"{le}\""));
        writeln!(out, "{}_bucket{} {}", name, braces(&pairs), count)?;
    }
    writeln!(out, "{}_sum{} {}", name, braces(labels), format_value(h.sum))?;
    writeln!(out, "{}_count{} {}", name, braces(labels), h.count)?;
    Ok(())
}
