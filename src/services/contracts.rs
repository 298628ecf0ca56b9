//! Contract-version gate: is a declared `MAJOR.MINOR.PATCH` inside the
//! accepted range?
//!
//! Incompatibility is a verdict, not an error. `ensure_compatible` exists for
//! callers that choose to make it fatal.

use crate::{ContractCheckResult, DEFAULT_EXPECTED_MAJOR, DEFAULT_EXPECTED_MINOR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ContractError {
    #[error("invalid schema version {0:?}: expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),
    #[error("schema version {version} is incompatible: expected {range}")]
    Incompatible { version: String, range: ContractRange },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl FromStr for SchemaVersion {
    type Err = ContractError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ContractError::InvalidVersion(raw.to_string());
        let mut parts = raw.split('.');
        let mut next = || -> Result<u64, ContractError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let version = SchemaVersion {
            major: next()?,
            minor: next()?,
            patch: next()?,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Accepted schema range: one major, an inclusive span of minors, any patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRange {
    #[serde(default = "default_major")]
    pub expected_major: u64,
    #[serde(default = "default_minor")]
    pub min_minor: u64,
    #[serde(default = "default_minor")]
    pub max_minor: u64,
}

fn default_major() -> u64 {
    DEFAULT_EXPECTED_MAJOR
}

fn default_minor() -> u64 {
    DEFAULT_EXPECTED_MINOR
}

impl Default for ContractRange {
    fn default() -> Self {
        Self::exact_minor(DEFAULT_EXPECTED_MAJOR, DEFAULT_EXPECTED_MINOR)
    }
}

impl ContractRange {
    pub fn exact_minor(expected_major: u64, minor: u64) -> Self {
        Self {
            expected_major,
            min_minor: minor,
            max_minor: minor,
        }
    }

    pub fn accepts(&self, version: &SchemaVersion) -> bool {
        version.major == self.expected_major
            && (self.min_minor..=self.max_minor).contains(&version.minor)
    }
}

impl fmt::Display for ContractRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min_minor == self.max_minor {
            write!(f, "{}.{}.x", self.expected_major, self.min_minor)
        } else {
            write!(
                f,
                "{}.{}.x..={}.{}.x",
                self.expected_major, self.min_minor, self.expected_major, self.max_minor
            )
        }
    }
}

/// True iff `version` parses and sits inside the range. Patch is ignored.
pub fn is_compatible(version: &str, expected_major: u64, min_minor: u64, max_minor: u64) -> bool {
    let range = ContractRange {
        expected_major,
        min_minor,
        max_minor,
    };
    version
        .parse::<SchemaVersion>()
        .map(|v| range.accepts(&v))
        .unwrap_or(false)
}

pub fn check_expected_minor_range(
    version: &str,
    expected_major: u64,
    min_minor: u64,
    max_minor: u64,
) -> ContractCheckResult {
    let compatible = is_compatible(version, expected_major, min_minor, max_minor);
    if !compatible {
        tracing::warn!(
            schema_version = version,
            expected_major,
            min_minor,
            max_minor,
            "schema version outside accepted range"
        );
    }
    ContractCheckResult {
        schema_version: version.to_string(),
        expected_major,
        min_minor,
        max_minor,
        compatible,
    }
}

pub fn check_range(version: &str, range: &ContractRange) -> ContractCheckResult {
    check_expected_minor_range(
        version,
        range.expected_major,
        range.min_minor,
        range.max_minor,
    )
}

pub fn ensure_compatible(version: &str, range: &ContractRange) -> Result<(), ContractError> {
    let parsed: SchemaVersion = version.parse()?;
    if range.accepts(&parsed) {
        Ok(())
    } else {
        Err(ContractError::Incompatible {
            version: version.to_string(),
            range: *range,
        })
    }
}
