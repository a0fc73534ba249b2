//! Tests for failure propagation and recovery

use super::helpers::{num, run_and_wait, Counter};
use crate::effect::types::errors::PANICKED;
use crate::effect::{Effect, EffectError, ErrorInfo, Val};

#[test]
fn test_recovery_skips_non_recovering_frames() {
    let skipped = Counter::default();
    let s1 = skipped.clone();
    let s2 = skipped.clone();

    let effect = Effect::raise("Boom", "inner")
        .flat_map(move |v| {
            s1.hit();
            Effect::Pure(v)
        })
        .map(move |v| {
            s2.hit();
            v
        })
        .handle_error(|e| Val::Str(format!("recovered {}", e.code())));

    assert_eq!(run_and_wait(effect), Ok(Val::Str("recovered Boom".into())));
    assert_eq!(skipped.get(), 0);
}

#[test]
fn test_handler_is_skipped_on_success() {
    let handled = Counter::default();
    let h = handled.clone();

    let effect = Effect::pure(1.0)
        .handle_error(move |_| {
            h.hit();
            Val::Null
        })
        .map(|v| Val::Num(num(&v) + 1.0));

    assert_eq!(run_and_wait(effect), Ok(Val::Num(2.0)));
    assert_eq!(handled.get(), 0);
}

#[test]
fn test_nearest_handler_wins() {
    let effect = Effect::raise("Boom", "x")
        .handle_error(|_| Val::Str("inner".into()))
        .handle_error(|_| Val::Str("outer".into()));

    assert_eq!(run_and_wait(effect), Ok(Val::Str("inner".into())));
}

#[test]
fn test_failure_inside_handler_reaches_outer_handler() {
    let effect = Effect::raise("First", "x")
        .handle_error_with(|_| Effect::raise("Second", "y"))
        .map(|_| Val::Str("unreachable".into()))
        .handle_error(|e| Val::Str(e.code().to_string()));

    assert_eq!(run_and_wait(effect), Ok(Val::Str("Second".into())));
}

#[test]
fn test_handler_panic_becomes_failure() {
    let effect = Effect::raise("Boom", "x").handle_error_with(|_| panic!("handler broke"));
    match run_and_wait(effect) {
        Err(e) => assert_eq!(e.code(), PANICKED),
        Ok(v) => panic!("expected failure, got {:?}", v),
    }
}

#[test]
fn test_recovered_chain_continues() {
    let effect = Effect::pure(1.0)
        .flat_map(|_| Effect::delay(|| Err(EffectError::raised("Io", "read"))))
        .handle_error(|_| Val::Num(10.0))
        .map(|v| Val::Num(num(&v) * 3.0));

    assert_eq!(run_and_wait(effect), Ok(Val::Num(30.0)));
}

#[test]
fn test_redeem_with_both_paths() {
    let ok = Effect::pure(2.0).redeem_with(
        |_| Effect::pure("error"),
        |v| Effect::pure(num(&v) + 1.0),
    );
    let err = Effect::raise("Boom", "x").redeem_with(
        |e| Effect::pure(e.code().to_string()),
        |_| Effect::pure("value"),
    );

    assert_eq!(run_and_wait(ok), Ok(Val::Num(3.0)));
    assert_eq!(run_and_wait(err), Ok(Val::Str("Boom".into())));
}

#[test]
fn test_attempt_reifies_failure() {
    let effect = Effect::raise("NotFound", "no such key").attempt();
    assert_eq!(
        run_and_wait(effect),
        Ok(Val::Error(ErrorInfo::new("NotFound", "no such key")))
    );

    let effect = Effect::pure(true).attempt();
    assert_eq!(run_and_wait(effect), Ok(Val::Bool(true)));
}
