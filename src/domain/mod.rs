//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep packet, metric, verdict and report structs in one place.
//! - Avoid cyclic imports between the metrics, invariant and report services.
//! - Make JSON report schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — packet wire model plus metrics/verdict/report value types.
//! - `constants.rs` — stable constants (report version, built-in contract, marker keys).
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem side effects.
//!
//! ## Compatibility note
//! Changes in these structs affect `report.json` and `--json` outputs.
//! Keep schema-impacting changes synchronized with `docs/contracts/report.schema.json`.

pub mod constants;
pub mod models;
