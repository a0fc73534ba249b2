//! Resumption across async boundaries
//!
//! When a run reaches an `Async` or `Deferred` node it stops and parks its
//! call stack in a [`RestartCallback`]. Whoever completes the boundary later
//! (possibly from another thread) re-enters the run-loop through the
//! [`AsyncCallback`] it was handed.
//!
//! One bridge serves a whole run, however many times it suspends. Each
//! suspension arms it with a fresh epoch and the callbacks handed out for
//! that suspension carry the epoch. A completion only resumes the run if it
//! wins the compare-and-swap on the armed epoch, so duplicate, late or stale
//! completions are ignored.

use super::run_loop::RunLoop;
use super::stack::CallStack;
use super::types::node::{Callback, DeferredBody, Registration};
use super::types::{Effect, EffectError, Val};
use crate::connection::Connection;
use crate::context::ExecutionContext;
use crate::fatal;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// No suspension is waiting for completion
const DISARMED: u64 = 0;

/* ===================== Restart Callback ===================== */

/// Suspended state of one run
pub struct RestartCallback {
    /// Connection the run resumes under
    conn: Mutex<Connection>,

    /// Terminal callback; taken when the run finishes
    callback: Mutex<Option<Callback>>,

    /// Frames captured at the latest suspension
    stack: Mutex<CallStack>,

    /// Epoch of the suspension waiting for completion
    armed: AtomicU64,

    /// Last epoch handed out
    epochs: AtomicU64,
}

impl RestartCallback {
    pub(crate) fn new(conn: Connection, callback: Callback) -> Arc<Self> {
        Arc::new(Self {
            conn: Mutex::new(conn),
            callback: Mutex::new(Some(callback)),
            stack: Mutex::new(CallStack::new()),
            armed: AtomicU64::new(DISARMED),
            epochs: AtomicU64::new(DISARMED),
        })
    }

    /// Connection the run will resume under
    pub fn connection(&self) -> Connection {
        self.conn.lock().clone()
    }

    /// Replace the connection the run resumes under
    pub fn update_connection(&self, conn: Connection) {
        *self.conn.lock() = conn;
    }

    /// Park the stack and open a new epoch
    ///
    /// Must happen before the boundary is registered: the registration may
    /// complete synchronously or race us from another thread.
    fn arm(&self, stack: CallStack) -> u64 {
        let epoch = self.epochs.fetch_add(1, Ordering::AcqRel) + 1;
        *self.stack.lock() = stack;
        self.armed.store(epoch, Ordering::Release);
        epoch
    }

    pub(crate) fn start_async(self: &Arc<Self>, register: Registration, stack: CallStack) {
        let frames = stack.len();
        let epoch = self.arm(stack);
        let callback = AsyncCallback {
            restart: Arc::clone(self),
            epoch,
        };
        tracing::trace!(epoch, frames, "suspending on async boundary");

        let conn = self.connection();
        let handle = callback.clone();
        if let Err(e) = fatal::guard(move || register(conn, handle)) {
            callback.complete(Err(e));
        }
    }

    pub(crate) fn start_deferred(
        self: &Arc<Self>,
        context: Arc<dyn ExecutionContext>,
        body: DeferredBody,
        stack: CallStack,
    ) {
        let frames = stack.len();
        let epoch = self.arm(stack);
        let callback = AsyncCallback {
            restart: Arc::clone(self),
            epoch,
        };
        tracing::trace!(epoch, frames, context = context.name(), "suspending on deferred body");

        context.execute(Box::new(move || {
            let handle = callback.clone();
            if let Err(e) = fatal::guard(move || body(handle)) {
                callback.complete(Err(e));
            }
        }));
    }

    fn complete(self: &Arc<Self>, epoch: u64, outcome: Result<Val, EffectError>) {
        if self
            .armed
            .compare_exchange(epoch, DISARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(epoch, "ignoring stale or duplicate completion");
            return;
        }

        let stack = std::mem::take(&mut *self.stack.lock());
        let node = match outcome {
            Ok(value) => Effect::Pure(value),
            Err(error) => Effect::Fail(error),
        };
        tracing::trace!(epoch, frames = stack.len(), "resuming after async boundary");
        RunLoop::resume(Arc::clone(self), stack).run(node);
    }

    /// Deliver the terminal outcome
    pub(crate) fn finish(&self, outcome: Result<Val, EffectError>) {
        let callback = self.callback.lock().take();
        match callback {
            Some(callback) => callback(outcome),
            None => tracing::error!("run finished twice, dropping outcome"),
        }
    }
}

impl fmt::Debug for RestartCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestartCallback")
            .field("conn", &*self.conn.lock())
            .field("armed", &self.armed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/* ===================== Async Callback ===================== */

/// Completion handle given to an async registration or deferred body
///
/// Only the first completion of a suspension resumes the run.
#[derive(Clone)]
pub struct AsyncCallback {
    restart: Arc<RestartCallback>,
    epoch: u64,
}

impl AsyncCallback {
    pub fn complete(&self, outcome: Result<Val, EffectError>) {
        self.restart.complete(self.epoch, outcome);
    }

    pub fn succeed(&self, value: impl Into<Val>) {
        self.complete(Ok(value.into()));
    }

    pub fn fail(&self, error: EffectError) {
        self.complete(Err(error));
    }

    /// Connection the run will resume under
    pub fn connection(&self) -> Connection {
        self.restart.connection()
    }

    /// Use as the terminal callback of another run
    pub fn into_callback(self) -> Callback {
        Box::new(move |outcome| self.complete(outcome))
    }
}

impl fmt::Debug for AsyncCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCallback")
            .field("epoch", &self.epoch)
            .finish()
    }
}
