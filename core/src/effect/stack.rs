//! Continuation stack
//!
//! The top frame lives in a direct slot, everything below it in a `Vec`.
//! Most chains only ever hold one pending frame, which then never touches
//! the heap-allocated part.

use super::types::Continuation;

/// Pending frames of one run, top first
#[derive(Debug, Default)]
pub struct CallStack {
    first: Option<Continuation>,
    rest: Vec<Continuation>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `frame` as the top, moving the previous top down
    pub fn push(&mut self, frame: Continuation) {
        if let Some(previous) = self.first.replace(frame) {
            self.rest.push(previous);
        }
    }

    /// Next frame a value should be applied to
    ///
    /// Recovery-only frames above it are dropped.
    pub fn pop_next(&mut self) -> Option<Continuation> {
        if let Some(frame) = self.first.take() {
            if frame.forwards() {
                return Some(frame);
            }
        }
        while let Some(frame) = self.rest.pop() {
            if frame.forwards() {
                return Some(frame);
            }
        }
        None
    }

    /// Nearest frame able to recover from a failure
    ///
    /// Frames above it are dropped without running. Frames below it stay.
    pub fn find_error_handler(&mut self) -> Option<Continuation> {
        if let Some(frame) = self.first.take() {
            if frame.recovers() {
                return Some(frame);
            }
        }
        while let Some(frame) = self.rest.pop() {
            if frame.recovers() {
                return Some(frame);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        usize::from(self.first.is_some()) + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.rest.is_empty()
    }
}
