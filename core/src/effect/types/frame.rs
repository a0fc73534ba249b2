//! Continuation frames
//!
//! A frame is what runs once the node below it has produced an outcome.
//! Frames are tagged by capability: whether they take a value forward, and
//! whether they can recover from an error. The run-loop only ever asks those
//! two questions.

use super::errors::EffectError;
use super::node::{BindFn, Effect, MapFn, RecoverFn, RestoreFn, Source};
use super::values::Val;
use crate::connection::Connection;
use std::fmt;

/// Pending step on the call stack
pub enum Continuation {
    /// Value to next node
    Bind(BindFn),

    /// Value to value
    Map(MapFn),

    /// Recovery only; skipped when a value passes through
    Handle(RecoverFn),

    /// Both paths
    Fold {
        on_value: BindFn,
        on_error: RecoverFn,
    },

    /// Reinstates a connection after a `SwitchConnection` source exits
    Restore { old: Connection, restore: RestoreFn },
}

impl Continuation {
    pub fn bind<F>(f: F) -> Self
    where
        F: FnOnce(Val) -> Effect + Send + 'static,
    {
        Continuation::Bind(Box::new(f))
    }

    pub fn handle<F>(f: F) -> Self
    where
        F: FnOnce(EffectError) -> Effect + Send + 'static,
    {
        Continuation::Handle(Box::new(f))
    }

    pub fn fold<V, E>(on_value: V, on_error: E) -> Self
    where
        V: FnOnce(Val) -> Effect + Send + 'static,
        E: FnOnce(EffectError) -> Effect + Send + 'static,
    {
        Continuation::Fold {
            on_value: Box::new(on_value),
            on_error: Box::new(on_error),
        }
    }

    /// Whether a value may be applied to this frame
    pub fn forwards(&self) -> bool {
        !matches!(self, Continuation::Handle(_))
    }

    /// Whether this frame can handle a failure
    pub fn recovers(&self) -> bool {
        matches!(
            self,
            Continuation::Handle(_) | Continuation::Fold { .. } | Continuation::Restore { .. }
        )
    }

    /// Next node for a value
    pub fn apply(self, value: Val) -> Effect {
        match self {
            Continuation::Bind(f) => f(value),
            Continuation::Map(f) => Effect::Pure(f(value)),
            Continuation::Handle(_) => Effect::Pure(value),
            Continuation::Fold { on_value, .. } => on_value(value),
            Continuation::Restore { old, restore } => {
                let exit = value.clone();
                Effect::SwitchConnection {
                    source: Source::new(Effect::Pure(value)),
                    modify: Box::new(move |current| restore(Ok(&exit), &old, &current)),
                    restore: None,
                }
            }
        }
    }

    /// Next node for a failure
    pub fn recover(self, error: EffectError) -> Effect {
        match self {
            Continuation::Handle(f) | Continuation::Fold { on_error: f, .. } => f(error),
            Continuation::Restore { old, restore } => {
                let exit = error.clone();
                Effect::SwitchConnection {
                    source: Source::new(Effect::Fail(error)),
                    modify: Box::new(move |current| restore(Err(&exit), &old, &current)),
                    restore: None,
                }
            }
            Continuation::Bind(_) | Continuation::Map(_) => Effect::Fail(error),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Continuation::Bind(_) => "Bind",
            Continuation::Map(_) => "Map",
            Continuation::Handle(_) => "Handle",
            Continuation::Fold { .. } => "Fold",
            Continuation::Restore { .. } => "Restore",
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Continuation::{}", self.kind())
    }
}
