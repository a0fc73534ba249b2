//! Tests for Bind and Map composition

use super::helpers::{add, num, run_and_wait};
use crate::effect::{Effect, Val};

fn double(v: Val) -> Effect {
    Effect::pure(num(&v) * 2.0)
}

fn plus_three(v: Val) -> Effect {
    Effect::pure(num(&v) + 3.0)
}

#[test]
fn test_bind_sequences_in_order() {
    let effect = Effect::pure(1.0)
        .flat_map(|v| Effect::pure(Val::List(vec![v, Val::Num(2.0)])))
        .flat_map(|v| match v {
            Val::List(mut items) => {
                items.push(Val::Num(3.0));
                Effect::Pure(Val::List(items))
            }
            other => Effect::Pure(other),
        });

    assert_eq!(
        run_and_wait(effect),
        Ok(Val::List(vec![Val::Num(1.0), Val::Num(2.0), Val::Num(3.0)]))
    );
}

#[test]
fn test_bind_associativity() {
    let left = Effect::pure(5.0).flat_map(double).flat_map(plus_three);
    let right = Effect::pure(5.0).flat_map(|x| double(x).flat_map(plus_three));

    assert_eq!(run_and_wait(left), run_and_wait(right));
}

#[test]
fn test_map_matches_bind_to_pure() {
    let mapped = Effect::pure(4.0).map(add(1.5));
    let bound = Effect::pure(4.0).flat_map(|x| Effect::Pure(add(1.5)(x)));

    assert_eq!(run_and_wait(mapped), Ok(Val::Num(5.5)));
    assert_eq!(run_and_wait(bound), Ok(Val::Num(5.5)));
}

#[test]
fn test_map_panic_becomes_failure() {
    let effect = Effect::pure(1.0).map(|_| panic!("bad mapper"));
    assert!(run_and_wait(effect).is_err());
}

/* ===================== Stack Safety ===================== */

const DEPTH: usize = 100_000;

fn right_nested(i: usize) -> Effect {
    if i == DEPTH {
        return Effect::pure(i as f64);
    }
    Effect::pure(i as f64).flat_map(move |_| right_nested(i + 1))
}

#[test]
fn test_right_nested_binds_are_stack_safe() {
    assert_eq!(run_and_wait(right_nested(0)), Ok(Val::Num(DEPTH as f64)));
}

#[test]
fn test_left_nested_binds_are_stack_safe() {
    let effect = (0..DEPTH).fold(Effect::pure(0.0), |e, _| {
        e.flat_map(|v| Effect::pure(num(&v) + 1.0))
    });
    assert_eq!(run_and_wait(effect), Ok(Val::Num(DEPTH as f64)));
}

#[test]
fn test_left_nested_maps_are_stack_safe() {
    let effect = (0..DEPTH).fold(Effect::pure(0.0), |e, _| e.map(add(1.0)));
    assert_eq!(run_and_wait(effect), Ok(Val::Num(DEPTH as f64)));
}

#[test]
fn test_nested_suspends_are_stack_safe() {
    fn countdown(n: usize) -> Effect {
        if n == 0 {
            return Effect::pure("done");
        }
        Effect::suspend(move || countdown(n - 1))
    }
    assert_eq!(run_and_wait(countdown(DEPTH)), Ok(Val::Str("done".into())));
}
