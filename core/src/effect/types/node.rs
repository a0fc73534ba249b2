//! Effect nodes
//!
//! An [`Effect`] describes a computation without running it. Nodes are owned
//! and single-use: the run-loop takes them apart by move as it interprets
//! them, so a node (and every closure inside it) runs at most once.

use super::errors::EffectError;
use super::frame::Continuation;
use super::values::Val;
use crate::connection::Connection;
use crate::context::ExecutionContext;
use crate::effect::restart::AsyncCallback;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/* ===================== Closure Types ===================== */

/// Terminal callback of a run, called exactly once
pub type Callback = Box<dyn FnOnce(Result<Val, EffectError>) + Send>;

pub type Thunk = Box<dyn FnOnce() -> Effect + Send>;
pub type DelayFn = Box<dyn FnOnce() -> Result<Val, EffectError> + Send>;

/// Hands control to an external mechanism, which must complete the
/// callback at most once (now or later, from any thread)
pub type Registration = Box<dyn FnOnce(Connection, AsyncCallback) + Send>;

/// Body started on an execution context; resumes the run through the callback
pub type DeferredBody = Box<dyn FnOnce(AsyncCallback) + Send>;

pub type BindFn = Box<dyn FnOnce(Val) -> Effect + Send>;
pub type MapFn = Box<dyn FnOnce(Val) -> Val + Send>;
pub type RecoverFn = Box<dyn FnOnce(EffectError) -> Effect + Send>;
pub type ModifyFn = Box<dyn FnOnce(Connection) -> Connection + Send>;

/// `restore(exit, old, current)` picks the connection to reinstate once the
/// source of a `SwitchConnection` has exited
pub type RestoreFn =
    Box<dyn FnOnce(Result<&Val, &EffectError>, &Connection, &Connection) -> Connection + Send>;

/* ===================== Effect ===================== */

/// One node of an effect description
pub enum Effect {
    /// Already-known result
    Pure(Val),

    /// Already-known failure
    Fail(EffectError),

    /// Lazily produces the next node
    Suspend(Thunk),

    /// Synchronous side effect, evaluated when reached
    Delay(DelayFn),

    /// Asynchronous boundary
    Async(Registration),

    /// Asynchronous boundary whose body starts on a given context
    Deferred {
        context: Arc<dyn ExecutionContext>,
        body: DeferredBody,
    },

    /// Run `source`, then hand its outcome to `cont`
    Bind {
        source: Source,
        cont: Continuation,
    },

    /// Run `source`, then map its value
    Map { source: Source, f: MapFn },

    /// Run `source`, then continue on `context`
    ContinueOn {
        context: Arc<dyn ExecutionContext>,
        source: Source,
    },

    /// Run `source` under the connection produced by `modify`
    SwitchConnection {
        source: Source,
        modify: ModifyFn,
        restore: Option<RestoreFn>,
    },
}

impl Effect {
    pub fn pure(value: impl Into<Val>) -> Self {
        Effect::Pure(value.into())
    }

    pub fn unit() -> Self {
        Effect::Pure(Val::Null)
    }

    pub fn fail(error: EffectError) -> Self {
        Effect::Fail(error)
    }

    /// Fail with a raised error carrying `code` and `message`
    pub fn raise(code: impl Into<String>, message: impl Into<String>) -> Self {
        Effect::Fail(EffectError::raised(code, message))
    }

    pub fn suspend<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Effect + Send + 'static,
    {
        Effect::Suspend(Box::new(thunk))
    }

    pub fn delay<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Result<Val, EffectError> + Send + 'static,
    {
        Effect::Delay(Box::new(thunk))
    }

    /// Async boundary; `register` receives the active connection and the
    /// callback that resumes the run
    pub fn register<F>(register: F) -> Self
    where
        F: FnOnce(Connection, AsyncCallback) + Send + 'static,
    {
        Effect::Async(Box::new(register))
    }

    pub fn deferred<F>(context: Arc<dyn ExecutionContext>, body: F) -> Self
    where
        F: FnOnce(AsyncCallback) + Send + 'static,
    {
        Effect::Deferred {
            context,
            body: Box::new(body),
        }
    }

    /// Child node of a combinator, if this is one
    fn source_mut(&mut self) -> Option<&mut Source> {
        match self {
            Effect::Bind { source, .. }
            | Effect::Map { source, .. }
            | Effect::ContinueOn { source, .. }
            | Effect::SwitchConnection { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Name of the node kind, for logs and debugging
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Pure(_) => "Pure",
            Effect::Fail(_) => "Fail",
            Effect::Suspend(_) => "Suspend",
            Effect::Delay(_) => "Delay",
            Effect::Async(_) => "Async",
            Effect::Deferred { .. } => "Deferred",
            Effect::Bind { .. } => "Bind",
            Effect::Map { .. } => "Map",
            Effect::ContinueOn { .. } => "ContinueOn",
            Effect::SwitchConnection { .. } => "SwitchConnection",
        }
    }
}

/* ===================== Source ===================== */

/// Owned child node of a combinator
///
/// Dropping a source tears its subtree down one level at a time, so a
/// left-nested chain of any depth can be dropped without being run.
pub struct Source(Box<Effect>);

impl Source {
    pub fn new(effect: Effect) -> Self {
        Source(Box::new(effect))
    }

    /// Take the node out for interpretation
    pub fn into_inner(mut self) -> Effect {
        self.take()
    }

    fn take(&mut self) -> Effect {
        std::mem::replace(&mut *self.0, Effect::unit())
    }
}

impl Deref for Source {
    type Target = Effect;

    fn deref(&self) -> &Effect {
        &self.0
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        if self.0.source_mut().is_none() {
            return;
        }
        let mut pending = vec![self.take()];
        while let Some(mut node) = pending.pop() {
            if let Some(source) = node.source_mut() {
                pending.push(source.take());
            }
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Pure(v) => f.debug_tuple("Pure").field(v).finish(),
            Effect::Fail(e) => f.debug_tuple("Fail").field(e).finish(),
            Effect::Deferred { context, .. } | Effect::ContinueOn { context, .. } => f
                .debug_struct(self.kind())
                .field("context", &context.name())
                .finish_non_exhaustive(),
            other => write!(f, "{}(..)", other.kind()),
        }
    }
}
