//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `runtime.rs` — run/report/contract/suites.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate evaluation logic to `services/*`.
//! - Keep behavior and output schema stable.

pub mod runtime;

pub use runtime::handle_runtime_commands;
