//! Replay recorded decision traces and evaluate them.
//!
//! The core is three pure engines over an in-memory packet slice:
//! [`compute_metrics`], [`check_invariants`] and the contract gate
//! [`is_compatible`]. [`build_report`] runs all three and packages the results
//! into one [`Report`]. Everything else (JSONL ingestion, fixtures, report
//! files, config, CLI) is a thin wrapper around them.

pub mod cli;
pub mod commands;
pub mod domain;
pub mod services;

pub use cli::*;
pub use commands::*;
pub use domain::constants::*;
pub use domain::models::*;
pub use services::config::*;
pub use services::contracts::*;
pub use services::fixtures::*;
pub use services::invariants::*;
pub use services::logging::*;
pub use services::metrics::*;
pub use services::output::*;
pub use services::packet_reader::*;
pub use services::report_builder::*;
pub use services::writer::*;
