pub mod benchmark;
pub mod cli;
pub mod config;
pub mod connection;
pub mod context;
pub mod effect;
pub mod fatal;

// Re-export the interpreter surface
pub use connection::Connection;
pub use context::ExecutionContext;
pub use effect::{run, run_cancelable, step, AsyncCallback, Continuation, Effect, EffectError, ErrorInfo, Val};
