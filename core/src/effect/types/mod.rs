//! Type definitions for the run-loop
//!
//! - Effect nodes (Effect) and the closure types they carry
//! - Continuation frames (Continuation)
//! - Runtime values (Val)
//! - Failures (EffectError, ErrorInfo)

pub mod errors;
pub mod frame;
pub mod node;
pub mod values;

pub use errors::{EffectError, ErrorInfo};
pub use frame::Continuation;
pub use node::{Callback, Effect, RestoreFn, Source};
pub use values::Val;
