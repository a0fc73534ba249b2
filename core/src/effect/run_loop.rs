//! Core run-loop
//!
//! This module contains the trampoline that interprets an [`Effect`] until it
//! either produces a terminal outcome or suspends at an async boundary.
//!
//! ## Loop State
//! All state lives in one [`RunLoop`] value: the active connection, the call
//! stack and where the terminal outcome goes. Nothing recurses, so chains of
//! any length run in constant host stack.
//!
//! ## Function Organization
//! 1. run() / run_cancelable() - Entry points
//! 2. RunLoop::run() - Main loop (cancellation check, dispatch, value delivery)
//! 3. reduce() / advance() - Node handling shared with `step`

use super::restart::RestartCallback;
use super::stack::CallStack;
use super::types::node::{Callback, ModifyFn};
use super::types::{Continuation, Effect, EffectError, RestoreFn, Source, Val};
use crate::connection::Connection;
use crate::context::ExecutionContext;
use crate::fatal;
use std::sync::Arc;

/* ===================== Public API ===================== */

/// Run `effect` on the uncancelable connection
///
/// `callback` is called exactly once, unless a fatal panic unwinds the run.
pub fn run<F>(effect: Effect, callback: F)
where
    F: FnOnce(Result<Val, EffectError>) + Send + 'static,
{
    run_cancelable(effect, Connection::uncancelable(), callback);
}

/// Run `effect`, observing cancellation of `conn` before each node
pub fn run_cancelable<F>(effect: Effect, conn: Connection, callback: F)
where
    F: FnOnce(Result<Val, EffectError>) + Send + 'static,
{
    RunLoop::start(conn, Box::new(callback), CallStack::new()).run(effect);
}

/* ===================== Run Loop ===================== */

/// Where the terminal outcome goes
enum Outlet {
    /// No suspension yet; the caller's callback is still held here
    Callback(Callback),

    /// The run has suspended at least once; the bridge holds the callback
    Restart(Arc<RestartCallback>),

    /// Outcome delivered
    Spent,
}

/// Mutable state of one run-loop invocation
pub(crate) struct RunLoop {
    conn: Connection,
    stack: CallStack,
    outlet: Outlet,
}

/// What the loop does next
enum Flow {
    Eval(Effect),
    Value(Val),
    Exit,
}

impl RunLoop {
    pub(crate) fn start(conn: Connection, callback: Callback, stack: CallStack) -> Self {
        Self {
            conn,
            stack,
            outlet: Outlet::Callback(callback),
        }
    }

    /// Loop state for a run re-entered through its bridge
    pub(crate) fn resume(restart: Arc<RestartCallback>, stack: CallStack) -> Self {
        Self {
            conn: restart.connection(),
            stack,
            outlet: Outlet::Restart(restart),
        }
    }

    /// Interpret nodes until the run finishes or suspends
    pub(crate) fn run(mut self, effect: Effect) {
        let mut flow = Flow::Eval(effect);
        loop {
            flow = match flow {
                Flow::Eval(node) => {
                    if self.conn.is_canceled() {
                        tracing::debug!(
                            conn = self.conn.id(),
                            abandoned = self.stack.len(),
                            "run cancelled"
                        );
                        self.finish(Err(EffectError::Cancelled))
                    } else {
                        self.eval(node)
                    }
                }
                Flow::Value(value) => match advance(&mut self.stack, value) {
                    Ok(next) => Flow::Eval(next),
                    Err(value) => self.finish(Ok(value)),
                },
                Flow::Exit => return,
            };
        }
    }

    fn eval(&mut self, node: Effect) -> Flow {
        match reduce(node, &mut self.stack) {
            Reduced::Next(next) => Flow::Eval(next),
            Reduced::Value(value) => Flow::Value(value),
            Reduced::Unhandled(error) => self.finish(Err(error)),
            Reduced::Boundary(Effect::Async(register)) => {
                let stack = std::mem::take(&mut self.stack);
                self.restart().start_async(register, stack);
                Flow::Exit
            }
            Reduced::Boundary(Effect::Deferred { context, body }) => {
                let stack = std::mem::take(&mut self.stack);
                self.restart().start_deferred(context, body, stack);
                Flow::Exit
            }
            Reduced::Boundary(Effect::SwitchConnection {
                source,
                modify,
                restore,
            }) => self.switch_connection(source, modify, restore),
            Reduced::Boundary(other) => {
                tracing::error!(kind = other.kind(), "run-loop reached a node it cannot handle");
                self.finish(Err(EffectError::Internal("unhandled boundary node")))
            }
        }
    }

    fn switch_connection(
        &mut self,
        source: Source,
        modify: ModifyFn,
        restore: Option<RestoreFn>,
    ) -> Flow {
        let old = self.conn.clone();
        let current = old.clone();
        let new = match fatal::guard(move || modify(current)) {
            Ok(conn) => conn,
            Err(e) => return Flow::Eval(Effect::Fail(e)),
        };

        if !new.same_as(&old) {
            if let Outlet::Restart(restart) = &self.outlet {
                restart.update_connection(new.clone());
            }
        }
        self.conn = new;

        match restore {
            Some(restore) => Flow::Eval(Effect::Bind {
                source,
                cont: Continuation::Restore { old, restore },
            }),
            None => Flow::Eval(source.into_inner()),
        }
    }

    /// Bridge for this run, created on the first suspension
    fn restart(&mut self) -> Arc<RestartCallback> {
        match std::mem::replace(&mut self.outlet, Outlet::Spent) {
            Outlet::Restart(restart) => {
                self.outlet = Outlet::Restart(Arc::clone(&restart));
                restart
            }
            Outlet::Callback(callback) => {
                let restart = RestartCallback::new(self.conn.clone(), callback);
                self.outlet = Outlet::Restart(Arc::clone(&restart));
                restart
            }
            Outlet::Spent => {
                // Unreachable: the loop exits as soon as it delivers.
                tracing::error!("suspending a run that already finished");
                RestartCallback::new(self.conn.clone(), Box::new(|_| {}))
            }
        }
    }

    fn finish(&mut self, outcome: Result<Val, EffectError>) -> Flow {
        match std::mem::replace(&mut self.outlet, Outlet::Spent) {
            Outlet::Callback(callback) => callback(outcome),
            Outlet::Restart(restart) => restart.finish(outcome),
            Outlet::Spent => tracing::error!("run finished twice, dropping outcome"),
        }
        Flow::Exit
    }
}

/* ===================== Shared Node Handling ===================== */

/// Outcome of reducing one node against the call stack
pub(super) enum Reduced {
    /// Keep interpreting this node
    Next(Effect),

    /// A value is ready for the next frame
    Value(Val),

    /// No frame on the stack recovers from this failure
    Unhandled(EffectError),

    /// `Async`, `Deferred` or `SwitchConnection`, which the caller handles
    Boundary(Effect),
}

/// Handle every node that only needs the call stack
pub(super) fn reduce(node: Effect, stack: &mut CallStack) -> Reduced {
    match node {
        Effect::Pure(value) => Reduced::Value(value),

        Effect::Fail(error) => match stack.find_error_handler() {
            Some(handler) => Reduced::Next(safely(move || handler.recover(error))),
            None => Reduced::Unhandled(error),
        },

        Effect::Suspend(thunk) => Reduced::Next(safely(thunk)),

        Effect::Delay(thunk) => match fatal::guard(thunk) {
            Ok(Ok(value)) => Reduced::Value(value),
            Ok(Err(error)) | Err(error) => Reduced::Next(Effect::Fail(error)),
        },

        Effect::Bind { source, cont } => {
            stack.push(cont);
            Reduced::Next(source.into_inner())
        }

        Effect::Map { source, f } => {
            stack.push(Continuation::Map(f));
            Reduced::Next(source.into_inner())
        }

        Effect::ContinueOn { context, source } => Reduced::Next(Effect::Bind {
            source,
            cont: Continuation::bind(move |value| shift(context, value)),
        }),

        boundary @ (Effect::Async(_)
        | Effect::Deferred { .. }
        | Effect::SwitchConnection { .. }) => Reduced::Boundary(boundary),
    }
}

/// Apply `value` to the next frame, or hand it back if none is left
pub(super) fn advance(stack: &mut CallStack, value: Val) -> Result<Effect, Val> {
    match stack.pop_next() {
        Some(frame) => Ok(safely(move || frame.apply(value))),
        None => Err(value),
    }
}

/// Run user code that produces a node, turning non-fatal panics into `Fail`
fn safely(f: impl FnOnce() -> Effect) -> Effect {
    fatal::guard(f).unwrap_or_else(Effect::Fail)
}

/// Suspend and resume on `context` with `value` unchanged
fn shift(context: Arc<dyn ExecutionContext>, value: Val) -> Effect {
    Effect::Deferred {
        context,
        body: Box::new(move |callback| callback.succeed(value)),
    }
}
