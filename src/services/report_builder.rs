use crate::{
    check_invariants_detailed, check_range, compute_metrics, ContractRange, InputStats, Packet,
    Report, SchemaVersion, DEFAULT_EXPECTED_MAJOR, REPORT_VERSION, SCHEMA_VERSION,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Evaluate `packets` against schema `0.<expected_schema_minor>.x`.
pub fn build_report(packets: &[Packet], suite_name: &str, expected_schema_minor: u64) -> Report {
    build_report_with(
        packets,
        suite_name,
        &ContractRange::exact_minor(DEFAULT_EXPECTED_MAJOR, expected_schema_minor),
        None,
    )
}

/// Metrics, invariants and the contract gate run independently over the same
/// packets; a failing gate or invariant never short-circuits the others.
pub fn build_report_with(
    packets: &[Packet],
    suite_name: &str,
    range: &ContractRange,
    seed: Option<u64>,
) -> Report {
    let metrics = compute_metrics(packets);
    let outcome = check_invariants_detailed(packets);
    let gated = gated_schema_version(packets, range);
    let contract = check_range(gated, range);

    tracing::debug!(
        suite = suite_name,
        packets = packets.len(),
        gated_schema = gated,
        "report assembled"
    );

    Report {
        report_version: REPORT_VERSION.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        packet_versions: packet_versions(packets),
        suite_name: suite_name.to_string(),
        seed,
        input_stats: input_stats(packets),
        metrics,
        invariant_results: outcome.verdicts,
        invariant_violations: outcome.violations,
        contract_ok: contract.compatible,
        contract_matrix_check: contract,
    }
}

/// The version the trace claims: its first non-empty packet version, or the
/// evaluator's built-in contract when the trace carries none.
pub fn declared_schema_version(packets: &[Packet]) -> &str {
    packets
        .iter()
        .map(|p| p.schema_version.as_str())
        .find(|v| !v.is_empty())
        .unwrap_or(SCHEMA_VERSION)
}

/// The version the gate judges. Every distinct packet version is checked;
/// the first one (in trace order) outside `range` is reported, so one stray
/// version fails the whole trace. With none out of range this is the
/// declared version.
pub fn gated_schema_version<'a>(packets: &'a [Packet], range: &ContractRange) -> &'a str {
    let mut seen = BTreeSet::new();
    packets
        .iter()
        .map(|p| p.schema_version.as_str())
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .find(|v| {
            v.parse::<SchemaVersion>()
                .map(|parsed| !range.accepts(&parsed))
                .unwrap_or(true)
        })
        .unwrap_or_else(|| declared_schema_version(packets))
}

fn packet_versions(packets: &[Packet]) -> Vec<String> {
    packets
        .iter()
        .filter(|p| !p.schema_version.is_empty())
        .map(|p| p.schema_version.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn input_stats(packets: &[Packet]) -> InputStats {
    let runs: BTreeSet<&str> = packets.iter().map(|p| p.run_id.as_str()).collect();
    InputStats {
        total_packets: packets.len(),
        distinct_runs: runs.len(),
        input_sha256: trace_digest(packets),
    }
}

/// Hex SHA-256 over the deterministic serde JSON of each packet, one per line.
pub fn trace_digest(packets: &[Packet]) -> String {
    let mut hasher = Sha256::new();
    for p in packets {
        match serde_json::to_vec(p) {
            Ok(bytes) => hasher.update(&bytes),
            Err(e) => tracing::warn!(run_id = %p.run_id, step = p.step, error = %e, "packet not hashable"),
        }
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
