//! Synchronous partial evaluation
//!
//! [`step`] runs the same reduction as the run-loop but never suspends and
//! never looks at a connection. It stops at the first thing it cannot do
//! synchronously and hands back what is left.

use super::run_loop::{advance, reduce, Reduced, RunLoop};
use super::stack::CallStack;
use super::types::Effect;

/// Evaluate `effect` as far as possible without suspending
///
/// The residual node is one of:
/// - `Pure` once the chain produced a value
/// - `Fail` for a failure nothing recovers from
/// - the `Async`/`Deferred` boundary itself, if nothing is pending after it
/// - an `Async` that resumes the pending frames (also used for
///   `SwitchConnection`, which needs a live connection)
pub fn step(effect: Effect) -> Effect {
    let mut stack = CallStack::new();
    let mut current = effect;
    loop {
        current = match reduce(current, &mut stack) {
            Reduced::Next(next) => next,
            Reduced::Value(value) => match advance(&mut stack, value) {
                Ok(next) => next,
                Err(value) => return Effect::Pure(value),
            },
            Reduced::Unhandled(error) => return Effect::Fail(error),
            Reduced::Boundary(node @ (Effect::Async(_) | Effect::Deferred { .. }))
                if stack.is_empty() =>
            {
                return node
            }
            Reduced::Boundary(node) => return resume_later(node, stack),
        };
    }
}

/// Async node that continues `node` with `stack` once run
fn resume_later(node: Effect, stack: CallStack) -> Effect {
    Effect::register(move |conn, callback| {
        RunLoop::start(conn, callback.into_callback(), stack).run(node);
    })
}
