//! Instrument registry tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use scrapemeter_core::{InstrumentKind, InstrumentRegistry, InstrumentSpec, MeterError};

#[test]
fn same_name_same_kind_returns_existing_handle() {
    let reg = InstrumentRegistry::new();
    let a = reg.create_instrument("requests_total", InstrumentKind::Counter, "reqs", "").unwrap();
    let b = reg.create_instrument("requests_total", InstrumentKind::Counter, "other", "").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(b.description(), "reqs");
    assert_eq!(reg.len(), 1);
}

#[test]
fn same_name_different_kind_is_rejected() {
    let reg = InstrumentRegistry::new();
    reg.create_instrument("latency", InstrumentKind::Histogram, "", "ms").unwrap();
    let err = reg
        .create_instrument("latency", InstrumentKind::Counter, "", "")
        .expect_err("must fail");
    assert_eq!(err.code().as_str(), "DUPLICATE_DEFINITION");
    match err {
        MeterError::DuplicateDefinition { existing, requested, .. } => {
            assert_eq!(existing, InstrumentKind::Histogram);
            assert_eq!(requested, InstrumentKind::Counter);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn lookup_missing_is_not_found() {
    let reg = InstrumentRegistry::new();
    let err = reg.lookup("nope").expect_err("must fail");
    assert_eq!(err.code().as_str(), "NOT_FOUND");

    let created = reg.create_instrument("yes", InstrumentKind::AsyncGauge, "", "By").unwrap();
    let found = reg.lookup("yes").unwrap();
    assert_eq!(created.id(), found.id());
    assert_eq!(found.unit(), "By");
}

#[test]
fn invalid_names_are_rejected() {
    let reg = InstrumentRegistry::new();
    let too_long = "x".repeat(256);
    for bad in ["", "1abc", "has space", "bad$char", too_long.as_str()] {
        let err = reg
            .create_instrument(bad, InstrumentKind::Counter, "", "")
            .expect_err("must fail");
        assert_eq!(err.code().as_str(), "INVALID_NAME", "name={bad:?}");
    }
    for ok in ["a", "test.my_counter", "http/server-duration", "A_1"] {
        reg.create_instrument(ok, InstrumentKind::Counter, "", "").unwrap();
    }
}

#[test]
fn histogram_boundaries_must_increase() {
    let reg = InstrumentRegistry::new();
    for bad in [vec![1.0, 1.0], vec![5.0, 2.0], vec![0.0, f64::NAN], vec![f64::INFINITY]] {
        let err = reg
            .create(InstrumentSpec::new("h", InstrumentKind::Histogram).with_boundaries(bad))
            .expect_err("must fail");
        assert_eq!(err.code().as_str(), "INVALID_BOUNDARIES");
    }
    let h = reg
        .create(InstrumentSpec::new("h", InstrumentKind::Histogram).with_boundaries(vec![10.0, 50.0, 100.0]))
        .unwrap();
    assert_eq!(h.boundaries(), &[10.0, 50.0, 100.0]);
}

#[test]
fn concurrent_creation_yields_one_instrument() {
    let reg = InstrumentRegistry::new();
    let ids: Vec<u64> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    reg.create_instrument("shared", InstrumentKind::Counter, "", "")
                        .unwrap()
                        .id()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(reg.len(), 1);
}
