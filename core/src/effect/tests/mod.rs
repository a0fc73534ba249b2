//! Tests for the effect run-loop
//!
//! Organized by feature area

mod async_tests;
mod bind_tests;
mod error_tests;
mod helpers;
