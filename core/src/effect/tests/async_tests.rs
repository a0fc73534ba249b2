//! Tests for async boundaries and the resumption bridge

use super::helpers::{extra_outcomes, num, run_and_wait, start, TIMEOUT};
use crate::connection::Connection;
use crate::context::{self, NewThread};
use crate::effect::{AsyncCallback, Effect, EffectError, Val};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_sync_completion_matches_pure() {
    let via_async = Effect::register(|_, cb| cb.succeed(9.0)).map(|v| Val::Num(num(&v) + 1.0));
    let via_pure = Effect::pure(9.0).map(|v| Val::Num(num(&v) + 1.0));

    assert_eq!(run_and_wait(via_async), run_and_wait(via_pure));
}

#[test]
fn test_completion_from_other_thread_delivered_once() {
    let effect = Effect::pure(1.0).flat_map(|_| {
        Effect::register(|_, cb| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                cb.fail(EffectError::raised("Remote", "first"));
                cb.fail(EffectError::raised("Remote", "second"));
                cb.succeed("third");
            });
        })
    });

    let rx = start(effect, Connection::uncancelable());
    assert_eq!(
        rx.recv_timeout(TIMEOUT).unwrap(),
        Err(EffectError::raised("Remote", "first"))
    );
    assert_eq!(extra_outcomes(&rx), 0);
}

#[test]
fn test_racing_completions_deliver_once() {
    let effect = Effect::register(|_, cb| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cb = cb.clone();
                thread::spawn(move || cb.succeed(i as f64))
            })
            .collect();
        drop(handles);
    })
    .map(|v| v);

    let rx = start(effect, Connection::uncancelable());
    assert!(rx.recv_timeout(TIMEOUT).unwrap().is_ok());
    assert_eq!(extra_outcomes(&rx), 0);
}

#[test]
fn test_stale_callback_cannot_resume_later_suspension() {
    let stale: Arc<Mutex<Option<AsyncCallback>>> = Arc::new(Mutex::new(None));
    let keep = stale.clone();
    let (pending_tx, pending_rx) = mpsc::channel::<AsyncCallback>();

    let effect = Effect::register(move |_, cb| {
        *keep.lock().unwrap() = Some(cb.clone());
        cb.succeed(1.0);
    })
    .flat_map(move |_| Effect::register(move |_, cb| pending_tx.send(cb).unwrap()));

    let rx = start(effect, Connection::uncancelable());
    let pending = pending_rx.recv_timeout(TIMEOUT).unwrap();

    // First suspension's callback fires again while the second is armed
    stale.lock().unwrap().take().unwrap().succeed("stale");
    assert!(rx.try_recv().is_err());

    pending.succeed("fresh");
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), Ok(Val::Str("fresh".into())));
}

#[test]
fn test_registration_panic_becomes_failure() {
    let effect = Effect::register(|_, _| panic!("could not register"));
    assert_eq!(
        run_and_wait(effect),
        Err(EffectError::Panicked("could not register".into()))
    );
}

#[test]
fn test_panic_after_completion_is_ignored() {
    let effect = Effect::register(|_, cb| {
        cb.succeed(5.0);
        panic!("late failure");
    });
    let rx = start(effect, Connection::uncancelable());
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), Ok(Val::Num(5.0)));
    assert_eq!(extra_outcomes(&rx), 0);
}

#[test]
fn test_registration_sees_active_connection() {
    let conn = Connection::new();
    let id = conn.id();
    let effect = Effect::register(|conn, cb| cb.succeed(conn.id() as f64));

    assert_eq!(
        super::helpers::run_on_and_wait(effect, conn),
        Ok(Val::Num(id as f64))
    );
}

#[test]
fn test_deferred_runs_on_its_context() {
    let ctx = context::shared(NewThread::named("deferred-body"));
    let effect = Effect::deferred(ctx, |cb| {
        let name = thread::current().name().unwrap_or_default().to_string();
        cb.succeed(name);
    });

    assert_eq!(run_and_wait(effect), Ok(Val::Str("deferred-body".into())));
}

#[test]
fn test_many_suspensions_keep_pending_frames() {
    fn hop(i: usize) -> Effect {
        if i == 200 {
            return Effect::pure(i as f64);
        }
        Effect::register(move |_, cb| {
            thread::spawn(move || cb.succeed(i as f64));
        })
        .map(move |v| Val::Num(num(&v) + 1.0))
        .flat_map(move |v| {
            assert_eq!(num(&v), (i + 1) as f64);
            hop(i + 1)
        })
    }

    assert_eq!(run_and_wait(hop(0)), Ok(Val::Num(200.0)));
}
