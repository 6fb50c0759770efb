//! Aggregation store and meter tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use scrapemeter_core::aggregation::HistogramPoint;
use scrapemeter_core::{
    AggregationStore, AttributeSet, InstrumentKind, InstrumentRegistry, InstrumentSpec, KeyValue, Meter,
    MeterConfig, Point, Temporality,
};

fn get(attrs: &[(&str, &str)]) -> AttributeSet {
    attrs.iter().map(|(k, v)| KeyValue::string(*k, *v)).collect()
}

fn histogram(point: Option<&Point>) -> HistogramPoint {
    match point {
        Some(Point::Histogram(h)) => h.clone(),
        other => panic!("expected histogram, got {other:?}"),
    }
}

#[test]
fn attribute_sets_ignore_insertion_order() {
    let a = AttributeSet::from([KeyValue::string("a", "1"), KeyValue::bool("b", true)]);
    let b = AttributeSet::from([KeyValue::bool("b", true), KeyValue::string("a", "1")]);
    assert_eq!(a, b);

    let dup = AttributeSet::from([KeyValue::i64("k", 1), KeyValue::i64("k", 2)]);
    assert_eq!(dup.len(), 1);
    assert_eq!(dup.get("k"), Some(&scrapemeter_core::Value::I64(2)));
}

#[test]
fn counter_sums_across_threads() {
    let meter = Meter::new(MeterConfig::default()).unwrap();
    let counter = meter.counter("requests_total", "", "").unwrap();
    let attrs = get(&[("method", "GET")]);

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..1000 {
                    counter.add(1.0, &attrs).unwrap();
                }
            });
        }
    });

    let snap = meter.snapshot();
    assert_eq!(snap.point("requests_total", &attrs), Some(&Point::Sum(8000.0)));
    assert_eq!(snap.series_count(), 1);
}

#[test]
fn histogram_buckets_sum_and_count() {
    let meter = Meter::new(MeterConfig::default()).unwrap();
    let h = meter
        .histogram_with_boundaries("latency_ms", "", "ms", vec![10.0, 50.0, 100.0])
        .unwrap();
    for v in [5.0, 20.0, 200.0] {
        h.record(v, &AttributeSet::empty()).unwrap();
    }

    let snap = meter.snapshot();
    let p = histogram(snap.point("latency_ms", &AttributeSet::empty()));
    assert_eq!(p.bucket_counts, vec![1, 1, 0, 1]);
    assert_eq!(p.cumulative_counts(), vec![1, 2, 2, 3]);
    assert_eq!(p.sum, 225.0);
    assert_eq!(p.count, 3);
}

#[test]
fn value_on_boundary_lands_in_that_bucket() {
    let meter = Meter::new(MeterConfig::default()).unwrap();
    let h = meter
        .histogram_with_boundaries("h", "", "", vec![10.0, 50.0])
        .unwrap();
    h.record(10.0, &AttributeSet::empty()).unwrap();
    h.record(50.0, &AttributeSet::empty()).unwrap();

    let p = histogram(meter.snapshot().point("h", &AttributeSet::empty()));
    assert_eq!(p.bucket_counts, vec![1, 1, 0]);
}

#[test]
fn histogram_without_boundaries_uses_meter_defaults() {
    let meter = Meter::new(MeterConfig {
        temporality: Temporality::Cumulative,
        default_boundaries: vec![1.0, 2.0],
    })
    .unwrap();
    let h = meter.histogram("h", "", "").unwrap();
    assert_eq!(h.instrument().boundaries(), &[1.0, 2.0]);
}

#[test]
fn gauge_keeps_last_value() {
    let reg = InstrumentRegistry::new();
    let store = AggregationStore::new(Temporality::Cumulative);
    let g = reg.create_instrument("mem", InstrumentKind::AsyncGauge, "", "By").unwrap();

    store.record_asynchronous(&g, &AttributeSet::empty(), 3.0).unwrap();
    store.record_asynchronous(&g, &AttributeSet::empty(), 1.5).unwrap();

    let snap = store.snapshot();
    assert_eq!(snap.point("mem", &AttributeSet::empty()), Some(&Point::Gauge(1.5)));
}

#[test]
fn recordings_are_checked_against_instrument_kind() {
    let reg = InstrumentRegistry::new();
    let store = AggregationStore::new(Temporality::Cumulative);
    let c = reg.create_instrument("c", InstrumentKind::Counter, "", "").unwrap();
    let g = reg.create_instrument("g", InstrumentKind::AsyncGauge, "", "").unwrap();
    let h = reg
        .create(InstrumentSpec::new("h", InstrumentKind::Histogram).with_boundaries(vec![1.0]))
        .unwrap();
    let none = AttributeSet::empty();

    for (inst, v) in [(&c, -1.0), (&c, f64::NAN), (&c, f64::INFINITY), (&h, f64::NAN), (&g, 1.0)] {
        let err = store.record_synchronous(inst, &none, v).expect_err("must fail");
        assert_eq!(err.code().as_str(), "INVALID_VALUE");
    }
    let err = store.record_asynchronous(&c, &none, 1.0).expect_err("must fail");
    assert_eq!(err.code().as_str(), "INVALID_VALUE");
    assert_eq!(store.series_count(), 0);
}

#[test]
fn delta_temporality_resets_after_acknowledge() {
    let reg = InstrumentRegistry::new();
    let store = AggregationStore::new(Temporality::Delta);
    let c = reg.create_instrument("c", InstrumentKind::Counter, "", "").unwrap();
    let g = reg.create_instrument("g", InstrumentKind::AsyncGauge, "", "").unwrap();
    let none = AttributeSet::empty();

    store.record_synchronous(&c, &none, 4.0).unwrap();
    store.record_asynchronous(&g, &none, 7.0).unwrap();
    let first = store.snapshot();
    assert_eq!(first.point("c", &none), Some(&Point::Sum(4.0)));
    store.acknowledge(&first);

    store.record_synchronous(&c, &none, 1.0).unwrap();
    let snap = store.snapshot();
    assert_eq!(snap.point("c", &none), Some(&Point::Sum(1.0)));
    assert_eq!(snap.point("g", &none), Some(&Point::Gauge(7.0)));
}

#[test]
fn unacknowledged_delta_is_exported_again() {
    let reg = InstrumentRegistry::new();
    let store = AggregationStore::new(Temporality::Delta);
    let h = reg
        .create(InstrumentSpec::new("h", InstrumentKind::Histogram).with_boundaries(vec![10.0]))
        .unwrap();
    let none = AttributeSet::empty();

    store.record_synchronous(&h, &none, 5.0).unwrap();
    let lost = store.snapshot();
    // delivery failed: no acknowledge
    store.record_synchronous(&h, &none, 50.0).unwrap();
    let retry = store.snapshot();
    assert_eq!(histogram(retry.point("h", &none)).bucket_counts, vec![1, 1]);

    // recordings made after `lost` was taken survive its acknowledge
    store.acknowledge(&lost);
    let rest = histogram(store.snapshot().point("h", &none));
    assert_eq!(rest.bucket_counts, vec![0, 1]);
    assert_eq!(rest.sum, 50.0);
    assert_eq!(rest.count, 1);
}

#[test]
fn cumulative_acknowledge_is_a_no_op() {
    let meter = Meter::new(MeterConfig::default()).unwrap();
    let c = meter.counter("c", "", "").unwrap();
    c.add(3.0, &AttributeSet::empty()).unwrap();
    meter.acknowledge(&meter.snapshot());
    assert_eq!(meter.snapshot().point("c", &AttributeSet::empty()), Some(&Point::Sum(3.0)));
}

#[test]
fn reset_zeroes_synchronous_series() {
    let meter = Meter::new(MeterConfig::default()).unwrap();
    let c = meter.counter("c", "", "").unwrap();
    c.add(5.0, &AttributeSet::empty()).unwrap();
    meter.store().reset();
    assert_eq!(meter.snapshot().point("c", &AttributeSet::empty()), Some(&Point::Sum(0.0)));
}

#[test]
fn snapshot_orders_by_name_then_attributes() {
    let meter = Meter::new(MeterConfig::default()).unwrap();
    let b = meter.counter("b_total", "", "").unwrap();
    let a = meter.counter("a_total", "", "").unwrap();
    b.inc(&get(&[("k", "2")])).unwrap();
    b.inc(&get(&[("k", "1")])).unwrap();
    a.inc(&AttributeSet::empty()).unwrap();

    let snap = meter.snapshot();
    let names: Vec<&str> = snap.families.iter().map(|f| f.instrument.name()).collect();
    assert_eq!(names, vec!["a_total", "b_total"]);
    let b_series: Vec<&AttributeSet> = snap.families[1].series.iter().map(|s| &s.attributes).collect();
    assert_eq!(b_series, vec![&get(&[("k", "1")]), &get(&[("k", "2")])]);
}

#[test]
fn shutdown_refuses_instruments_and_drops_recordings() {
    let meter = Meter::new(MeterConfig::default()).unwrap();
    let c = meter.counter("c", "", "").unwrap();
    c.inc(&AttributeSet::empty()).unwrap();

    meter.shutdown();
    assert!(meter.is_shut_down());
    c.inc(&AttributeSet::empty()).unwrap();

    let err = meter.counter("d", "", "").err().expect("must fail");
    assert_eq!(err.code().as_str(), "SHUT_DOWN");
    assert_eq!(meter.snapshot().point("c", &AttributeSet::empty()), Some(&Point::Sum(1.0)));
}

#[test]
fn shutdown_drops_observations_too() {
    let meter = Meter::new(MeterConfig::default()).unwrap();
    let g = meter.async_gauge("g", "", "").unwrap();
    meter.observe(g.instrument(), &AttributeSet::empty(), 1.0).unwrap();

    meter.shutdown();
    meter.observe(g.instrument(), &AttributeSet::empty(), 2.0).unwrap();
    assert_eq!(meter.snapshot().point("g", &AttributeSet::empty()), Some(&Point::Gauge(1.0)));
}

#[test]
fn handle_from_another_meter_is_rejected() {
    let a = Meter::new(MeterConfig::default()).unwrap();
    let b = Meter::new(MeterConfig::default()).unwrap();
    let a_counter = a.counter("a_counter", "", "").unwrap();
    let b_hist = b.histogram_with_boundaries("b_hist", "", "", vec![10.0]).unwrap();
    b_hist.record(1.0, &AttributeSet::empty()).unwrap();

    let err = b
        .record(a_counter.instrument(), &AttributeSet::empty(), 500.0)
        .expect_err("must fail");
    assert_eq!(err.code().as_str(), "NOT_FOUND");

    let snap = b.snapshot();
    let h = histogram(snap.point("b_hist", &AttributeSet::empty()));
    assert_eq!(h.bucket_counts, vec![1, 0]);
    assert_eq!(h.sum, 1.0);
    assert_eq!(h.count, 1);
    assert!(snap.family("a_counter").is_none());
    assert_eq!(b.store().series_count(), 1);

    // the owning meter still accepts it
    a_counter.add(500.0, &AttributeSet::empty()).unwrap();
    assert_eq!(a.snapshot().point("a_counter", &AttributeSet::empty()), Some(&Point::Sum(500.0)));
}

#[test]
fn registries_share_one_id_space() {
    let r1 = InstrumentRegistry::default();
    let r2 = InstrumentRegistry::new();
    let x = r1.create_instrument("x", InstrumentKind::Counter, "", "").unwrap();
    let y = r2.create_instrument("y", InstrumentKind::Histogram, "", "").unwrap();
    assert_ne!(x.id(), 0);
    assert_ne!(x.id(), y.id());
    assert!(r1.owns(&x));
    assert!(!r2.owns(&x));

    // one store fed by both registries keeps the series apart
    let store = AggregationStore::new(Temporality::Cumulative);
    store.record_synchronous(&x, &AttributeSet::empty(), 2.0).unwrap();
    store.record_synchronous(&y, &AttributeSet::empty(), 3.0).unwrap();
    let snap = store.snapshot();
    assert_eq!(snap.point("x", &AttributeSet::empty()), Some(&Point::Sum(2.0)));
    assert_eq!(histogram(snap.point("y", &AttributeSet::empty())).count, 1);
}

#[test]
fn meter_rejects_bad_default_boundaries() {
    let err = Meter::new(MeterConfig {
        temporality: Temporality::Cumulative,
        default_boundaries: vec![3.0, 1.0],
    })
    .err()
    .expect("must fail");
    assert_eq!(err.code().as_str(), "INVALID_BOUNDARIES");
}
