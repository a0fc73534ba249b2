//! Test helpers for run-loop tests
//!
//! Utilities for running effects and waiting on their callbacks

use crate::connection::Connection;
use crate::effect::{run_cancelable, Effect, EffectError, Val};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Run on the uncancelable connection and wait for the outcome
pub fn run_and_wait(effect: Effect) -> Result<Val, EffectError> {
    run_on_and_wait(effect, Connection::uncancelable())
}

/// Run on `conn` and wait for the outcome
pub fn run_on_and_wait(effect: Effect, conn: Connection) -> Result<Val, EffectError> {
    let rx = start(effect, conn);
    rx.recv_timeout(TIMEOUT).expect("run did not complete")
}

/// Start a run whose outcomes land on the returned channel
pub fn start(effect: Effect, conn: Connection) -> mpsc::Receiver<Result<Val, EffectError>> {
    let (tx, rx) = mpsc::channel();
    run_cancelable(effect, conn, move |outcome| {
        let _ = tx.send(outcome);
    });
    rx
}

/// Number of further outcomes arriving within a short grace period
pub fn extra_outcomes(rx: &mpsc::Receiver<Result<Val, EffectError>>) -> usize {
    let mut extra = 0;
    while rx.recv_timeout(Duration::from_millis(100)).is_ok() {
        extra += 1;
    }
    extra
}

pub fn num(value: &Val) -> f64 {
    value.expect_num().unwrap()
}

pub fn add(n: f64) -> impl FnOnce(Val) -> Val + Send + 'static {
    move |v| Val::Num(num(&v) + n)
}

/// Shared counter for observing side effects
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
