//! Integration test: evaluator failure and retry.
//!
//! A closure relation that rejects an input must not leave a stale
//! value looking fresh. The error surfaces with the evaluator's name and
//! the offending entity; after the outer solver cuts its step and
//! rewrites the primary, the same read succeeds.

use thaw_core::{EntityKind, ErrorClass, FieldKey, ThawError};
use thaw_engine::{FieldStatus, State};
use thaw_evaluator::PrimaryVariable;
use thaw_test_utils::domain_column;
use thaw_test_utils::fixtures::{Failing, WeightedSum};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `saturation` (primary) -> `clipped` (fails above 1) -> `doubled`.
fn guarded() -> State {
    let mut state = State::new(domain_column(4));
    state.register(Box::new(PrimaryVariable::new("saturation"))).unwrap();
    state
        .register(Box::new(Failing::new("clipped", "saturation", 1.0)))
        .unwrap();
    state
        .register(Box::new(WeightedSum::new("doubled", ["clipped"], &[2.0])))
        .unwrap();
    state.setup().unwrap();
    state
}

#[test]
fn domain_error_names_evaluator_and_entity() {
    init_tracing();
    let mut state = guarded();
    {
        let s = state.primary_mut(&FieldKey::new("saturation")).unwrap();
        s.component_mut(EntityKind::Cell)
            .unwrap()
            .copy_from_slice(&[0.2, 0.4, 1.3, 0.9]);
    }
    match state.field(&FieldKey::new("doubled")) {
        Err(ThawError::Domain {
            evaluator, entity, ..
        }) => {
            assert_eq!(evaluator, FieldKey::new("clipped"));
            assert_eq!(entity, Some(2));
        }
        other => panic!("expected Domain, got {other:?}"),
    }
}

#[test]
fn failed_field_stays_stale_until_retry_succeeds() {
    init_tracing();
    let mut state = guarded();
    let clipped = FieldKey::new("clipped");
    let doubled = FieldKey::new("doubled");

    state.fill_primary(&FieldKey::new("saturation"), 0.5).unwrap();
    assert_eq!(state.field(&doubled).unwrap().norm_inf(), 1.0);

    state.fill_primary(&FieldKey::new("saturation"), 1.5).unwrap();
    let err = state.field(&doubled).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Numerical);
    assert!(err.is_recoverable());
    assert_eq!(state.status(&clipped).unwrap(), FieldStatus::Stale);
    assert_eq!(state.status(&doubled).unwrap(), FieldStatus::Stale);

    // Reading again without a change retries and fails the same way.
    assert!(state.field(&doubled).is_err());

    state.fill_primary(&FieldKey::new("saturation"), 0.75).unwrap();
    assert_eq!(state.field(&doubled).unwrap().norm_inf(), 1.5);
    assert_eq!(state.status(&clipped).unwrap(), FieldStatus::Fresh);
}

#[test]
fn failure_does_not_consume_change_report() {
    init_tracing();
    let mut state = guarded();
    let doubled = FieldKey::new("doubled");

    state.fill_primary(&FieldKey::new("saturation"), 0.5).unwrap();
    assert!(state.has_changed(&doubled, "flow pk").unwrap());

    state.fill_primary(&FieldKey::new("saturation"), 2.0).unwrap();
    assert!(state.has_changed(&doubled, "flow pk").is_err());

    state.fill_primary(&FieldKey::new("saturation"), 0.25).unwrap();
    assert!(state.has_changed(&doubled, "flow pk").unwrap());
    assert!(!state.has_changed(&doubled, "flow pk").unwrap());
}
