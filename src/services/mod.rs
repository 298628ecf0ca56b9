//! Service layer containing evaluation logic and side-effect helpers.
//!
//! ## Service map
//! - `metrics.rs` — action distribution, guard rates, safety rate, latency percentiles.
//! - `invariants.rs` — batch invariants (contract closure, confidence, fail-closed, version).
//! - `contracts.rs` — schema version parsing and range gate.
//! - `report_builder.rs` — report assembly from the three engines.
//! - `packet_reader.rs` — JSONL trace ingestion.
//! - `fixtures.rs` — named synthetic traces.
//! - `writer.rs` — report.json / report.md persistence.
//! - `config.rs` — TOML config with defaults.
//! - `logging.rs` — tracing subscriber setup.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - The metrics, invariant, contract and report services are pure.
//! - Side effects should be explicit and localized (`packet_reader`, `writer`, `config`).
//! - Keep command handlers thin; delegate to services.

pub mod config;
pub mod contracts;
pub mod fixtures;
pub mod invariants;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod packet_reader;
pub mod report_builder;
pub mod writer;
