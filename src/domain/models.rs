use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// Closed enumeration of decision actions a packet may propose or take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Act,
    Exit,
    Hold,
    Cancel,
    Stop,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Act,
        Action::Exit,
        Action::Hold,
        Action::Cancel,
        Action::Stop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Act => "ACT",
            Action::Exit => "EXIT",
            Action::Hold => "HOLD",
            Action::Cancel => "CANCEL",
            Action::Stop => "STOP",
        }
    }

    /// Exact, case-sensitive match against the wire spelling.
    pub fn parse(raw: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.as_str() == raw)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision proposed by the model (`mdm` on the wire).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// The decision actually taken after any override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Absent means allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<bool>,
}

impl FinalAction {
    pub fn is_allowed(&self) -> bool {
        self.allowed.unwrap_or(true)
    }
}

/// A JSON `null` on a collection reads as the empty collection.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub flags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason_codes: Vec<String>,
}

impl Mismatch {
    pub fn has_deny_flags(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// One evaluated decision step of a recorded trace.
///
/// Unknown keys are ignored on read and optional keys are defaulted, so traces
/// from newer producers stay readable. Validity (action closure, confidence
/// range, version presence) is judged by the invariant checker, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub run_id: String,
    pub step: u64,
    #[serde(default)]
    pub schema_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub input: Map<String, Value>,
    /// `None` when the producer omitted the mapping entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<Map<String, Value>>,
    #[serde(default)]
    pub mdm: Proposal,
    #[serde(default)]
    pub final_action: FinalAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub mismatch: Option<Mismatch>,
}

impl Packet {
    pub fn is_allowed(&self) -> bool {
        self.final_action.is_allowed()
    }

    pub fn has_deny_flags(&self) -> bool {
        self.mismatch.as_ref().is_some_and(Mismatch::has_deny_flags)
    }
}

/// Keys of [`MetricsResult`]. The serialized metrics object carries exactly
/// these keys regardless of input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKey {
    ActionDistribution,
    GuardTriggerRates,
    SafetyInvariantPassRate,
    LatencyPercentiles,
    TotalSteps,
}

impl MetricKey {
    pub const ALL: [MetricKey; 5] = [
        MetricKey::ActionDistribution,
        MetricKey::GuardTriggerRates,
        MetricKey::SafetyInvariantPassRate,
        MetricKey::LatencyPercentiles,
        MetricKey::TotalSteps,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::ActionDistribution => "action_distribution",
            MetricKey::GuardTriggerRates => "guard_trigger_rates",
            MetricKey::SafetyInvariantPassRate => "safety_invariant_pass_rate",
            MetricKey::LatencyPercentiles => "latency_percentiles",
            MetricKey::TotalSteps => "total_steps",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub action_distribution: BTreeMap<String, u64>,
    pub guard_trigger_rates: BTreeMap<String, f64>,
    pub safety_invariant_pass_rate: f64,
    pub latency_percentiles: LatencyPercentiles,
    pub total_steps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Invariant {
    ContractClosure,
    ConfidenceClamp,
    FailClosed,
    PacketVersion,
}

impl Invariant {
    pub const ALL: [Invariant; 4] = [
        Invariant::ContractClosure,
        Invariant::ConfidenceClamp,
        Invariant::FailClosed,
        Invariant::PacketVersion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Invariant::ContractClosure => "contract_closure",
            Invariant::ConfidenceClamp => "confidence_clamp",
            Invariant::FailClosed => "fail_closed",
            Invariant::PacketVersion => "packet_version",
        }
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two halves of the fail-closed invariant. Both must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailClosedRule {
    /// A guard raised deny flags, so the final action must not be allowed.
    DenyFlagsBlock,
    /// A denial without any mismatch must carry a fail-closed marker in `external`.
    FaultPathMarker,
}

impl FailClosedRule {
    pub fn as_str(self) -> &'static str {
        match self {
            FailClosedRule::DenyFlagsBlock => "deny_flags_block",
            FailClosedRule::FaultPathMarker => "fault_path_marker",
        }
    }
}

/// Pass/fail per registered invariant, always covering [`Invariant::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvariantVerdicts(BTreeMap<Invariant, bool>);

impl InvariantVerdicts {
    pub(crate) fn from_fn(mut verdict: impl FnMut(Invariant) -> bool) -> Self {
        Self(Invariant::ALL.into_iter().map(|i| (i, verdict(i))).collect())
    }

    pub fn get(&self, invariant: Invariant) -> bool {
        self.0.get(&invariant).copied().unwrap_or(false)
    }

    pub fn all_passed(&self) -> bool {
        self.0.values().all(|passed| *passed)
    }

    pub fn failed(&self) -> Vec<Invariant> {
        self.0
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(i, _)| *i)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Invariant, bool)> + '_ {
        self.0.iter().map(|(i, p)| (*i, *p))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantViolation {
    pub invariant: Invariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<FailClosedRule>,
    pub run_id: String,
    pub step: u64,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCheckResult {
    pub schema_version: String,
    pub expected_major: u64,
    pub min_minor: u64,
    pub max_minor: u64,
    pub compatible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStats {
    pub total_packets: usize,
    pub distinct_runs: usize,
    pub input_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_version: String,
    pub schema_version: String,
    pub packet_versions: Vec<String>,
    pub suite_name: String,
    pub seed: Option<u64>,
    pub input_stats: InputStats,
    pub metrics: MetricsResult,
    pub invariant_results: InvariantVerdicts,
    #[serde(default)]
    pub invariant_violations: Vec<InvariantViolation>,
    pub contract_matrix_check: ContractCheckResult,
    pub contract_ok: bool,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.contract_ok && self.invariant_results.all_passed()
    }
}

#[derive(Serialize)]
pub struct RunSummary {
    pub suite_name: String,
    pub out_dir: String,
    pub total_packets: usize,
    pub contract_ok: bool,
    pub invariants_passed: bool,
    pub failed_invariants: Vec<String>,
    pub overall: String,
}

#[derive(Serialize, Clone)]
pub struct SuiteInfo {
    pub name: String,
    pub steps: usize,
    pub description: String,
}
