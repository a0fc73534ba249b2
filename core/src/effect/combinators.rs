//! Composition methods
//!
//! Thin constructors over [`Effect`] nodes and [`Continuation`] frames. They
//! only build descriptions; nothing runs until the result reaches the
//! run-loop.

use super::types::{Continuation, Effect, EffectError, Source, Val};
use crate::connection::Connection;
use crate::context::ExecutionContext;
use std::sync::Arc;

impl Effect {
    /// Sequence: feed this effect's value to `f`
    pub fn flat_map<F>(self, f: F) -> Effect
    where
        F: FnOnce(Val) -> Effect + Send + 'static,
    {
        Effect::Bind {
            source: Source::new(self),
            cont: Continuation::bind(f),
        }
    }

    pub fn map<F>(self, f: F) -> Effect
    where
        F: FnOnce(Val) -> Val + Send + 'static,
    {
        Effect::Map {
            source: Source::new(self),
            f: Box::new(f),
        }
    }

    /// Replace a failure of this effect with the effect `f` returns
    ///
    /// Values pass through untouched. Cancellation is never seen here.
    pub fn handle_error_with<F>(self, f: F) -> Effect
    where
        F: FnOnce(EffectError) -> Effect + Send + 'static,
    {
        Effect::Bind {
            source: Source::new(self),
            cont: Continuation::handle(f),
        }
    }

    pub fn handle_error<F>(self, f: F) -> Effect
    where
        F: FnOnce(EffectError) -> Val + Send + 'static,
    {
        self.handle_error_with(move |e| Effect::Pure(f(e)))
    }

    /// Continue with `on_value` or `on_error` depending on the outcome
    pub fn redeem_with<E, V>(self, on_error: E, on_value: V) -> Effect
    where
        E: FnOnce(EffectError) -> Effect + Send + 'static,
        V: FnOnce(Val) -> Effect + Send + 'static,
    {
        Effect::Bind {
            source: Source::new(self),
            cont: Continuation::fold(on_value, on_error),
        }
    }

    /// Reify a failure as a `Val::Error` value
    pub fn attempt(self) -> Effect {
        self.redeem_with(|e| Effect::Pure(Val::Error(e.to_info())), Effect::Pure)
    }

    /// Run the rest of the chain on `context`
    pub fn continue_on(self, context: Arc<dyn ExecutionContext>) -> Effect {
        Effect::ContinueOn {
            context,
            source: Source::new(self),
        }
    }

    /// Run this effect under the connection `modify` derives from the active
    /// one; `restore` picks the connection to reinstate afterwards
    pub fn switch_connection<M, R>(self, modify: M, restore: R) -> Effect
    where
        M: FnOnce(Connection) -> Connection + Send + 'static,
        R: FnOnce(Result<&Val, &EffectError>, &Connection, &Connection) -> Connection
            + Send
            + 'static,
    {
        Effect::SwitchConnection {
            source: Source::new(self),
            modify: Box::new(modify),
            restore: Some(Box::new(restore)),
        }
    }

    /// Run this effect on the uncancelable connection, then switch back
    pub fn uncancelable(self) -> Effect {
        self.switch_connection(
            |_| Connection::uncancelable(),
            |_, old: &Connection, _| old.clone(),
        )
    }
}
