/// Version of the report layout written by this evaluator.
pub const REPORT_VERSION: &str = "0.1.0";

/// Decision-schema contract version this evaluator is built against.
pub const SCHEMA_VERSION: &str = "0.2.2";

pub const DEFAULT_EXPECTED_MAJOR: u64 = 0;
pub const DEFAULT_EXPECTED_MINOR: u64 = 2;

pub const DEFAULT_SUITE: &str = "smoke";
pub const DEFAULT_OUT_DIR: &str = "reports/latest";
pub const DEFAULT_SEED: u64 = 42;

/// Bucket for final actions that are missing or outside the action enumeration.
pub const UNKNOWN_ACTION: &str = "UNKNOWN";

/// Exact `external` key (or key suffix after a dot) proving a fault-path denial.
pub const FAIL_CLOSED_MARKER: &str = "fail_closed";

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_MD: &str = "report.md";
