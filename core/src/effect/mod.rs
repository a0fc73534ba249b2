//! # Effect Run-Loop
//!
//! Interpreter for effect descriptions.
//!
//! ## Core Principles
//!
//! 1. **Trampolined**: one loop, one mutable state value, no recursion per node
//! 2. **Capability-tagged frames**: the loop only asks a frame whether it
//!    forwards values and whether it recovers errors
//! 3. **Suspend by returning**: async boundaries park the call stack in a
//!    bridge and return; completion re-enters the loop from any thread
//! 4. **Exactly once**: every run delivers one outcome, guarded by an epoch
//!    compare-and-swap across suspensions
//!
//! ## Entry Points
//!
//! - [`run`]: uncancelable run with a callback
//! - [`run_cancelable`]: run observing a [`Connection`](crate::connection::Connection)
//! - [`step`]: synchronous partial evaluation

pub mod combinators;
pub mod restart;
pub mod run_loop;
pub mod stack;
pub mod step;
pub mod types;

#[cfg(test)]
mod tests;

pub use restart::{AsyncCallback, RestartCallback};
pub use run_loop::{run, run_cancelable};
pub use stack::CallStack;
pub use step::step;
pub use types::{Callback, Continuation, Effect, EffectError, ErrorInfo, RestoreFn, Val};
