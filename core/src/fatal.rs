//! Fatal vs non-fatal panics
//!
//! User code run by the loop (thunks, continuations, recovery functions) may
//! panic. Non-fatal panics are turned into `EffectError::Panicked` and
//! travel through recovery like any other failure. Fatal panics are never
//! caught: the loop resumes unwinding and the run is abandoned without
//! calling its callback.
//!
//! By default a panic is fatal only when its payload is a [`Fatal`] value
//! (raise one with `std::panic::panic_any(Fatal::new(..))`). Hosts with other
//! needs install their own predicate with [`set_classifier`].

use crate::effect::types::EffectError;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Panic payload that the default classifier treats as fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fatal {
    pub reason: String,
}

impl Fatal {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fatal: {}", self.reason)
    }
}

/// Predicate deciding whether a panic payload may be recovered from
pub type Classifier = fn(&(dyn Any + Send)) -> bool;

static CLASSIFIER: RwLock<Classifier> = parking_lot::const_rwlock(default_classifier);

fn default_classifier(payload: &(dyn Any + Send)) -> bool {
    !payload.is::<Fatal>()
}

/// Replace the process-wide classifier, returning the previous one
pub fn set_classifier(classifier: Classifier) -> Classifier {
    std::mem::replace(&mut *CLASSIFIER.write(), classifier)
}

/// Whether a panic with this payload should become a failure
pub fn is_non_fatal(payload: &(dyn Any + Send)) -> bool {
    let classifier = *CLASSIFIER.read();
    classifier(payload)
}

/// Best-effort message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(fatal) = payload.downcast_ref::<Fatal>() {
        fatal.to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Run user code, turning a non-fatal panic into `EffectError::Panicked`
///
/// Fatal panics keep unwinding.
pub(crate) fn guard<T>(f: impl FnOnce() -> T) -> Result<T, EffectError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => {
            if !is_non_fatal(payload.as_ref()) {
                panic::resume_unwind(payload);
            }
            let message = panic_message(payload.as_ref());
            tracing::warn!(panic = %message, "user code panicked, continuing with a failure");
            Err(EffectError::Panicked(message))
        }
    }
}
