//! Aggregate statistics over a packet sequence.
//!
//! Every function here is pure: same packets in, same numbers out. Malformed
//! or missing optional fields are defaulted, never rejected.

use crate::{Action, LatencyPercentiles, MetricsResult, Packet, UNKNOWN_ACTION};
use std::collections::{BTreeMap, BTreeSet};

pub fn compute_metrics(packets: &[Packet]) -> MetricsResult {
    if packets.is_empty() {
        return MetricsResult {
            action_distribution: BTreeMap::new(),
            guard_trigger_rates: BTreeMap::new(),
            safety_invariant_pass_rate: 1.0,
            latency_percentiles: LatencyPercentiles::default(),
            total_steps: 0,
        };
    }

    let metrics = MetricsResult {
        action_distribution: action_distribution(packets),
        guard_trigger_rates: guard_trigger_rates(packets),
        safety_invariant_pass_rate: safety_invariant_pass_rate(packets),
        latency_percentiles: latency_percentiles(packets),
        total_steps: packets.len() as u64,
    };
    tracing::debug!(
        total_steps = metrics.total_steps,
        guard_codes = metrics.guard_trigger_rates.len(),
        "metrics computed"
    );
    metrics
}

/// Count of packets per final action. Missing or unrecognized actions land
/// in the `UNKNOWN` bucket so the counts always sum to the step total.
pub fn action_distribution(packets: &[Packet]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for p in packets {
        let bucket = p
            .final_action
            .action
            .as_deref()
            .and_then(Action::parse)
            .map(Action::as_str)
            .unwrap_or(UNKNOWN_ACTION);
        *counts.entry(bucket.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Fraction of packets whose mismatch carries each reason code.
///
/// A code listed twice on the same packet still counts once for that packet,
/// so every rate stays within `[0, 1]`.
pub fn guard_trigger_rates(packets: &[Packet]) -> BTreeMap<String, f64> {
    let total = packets.len();
    if total == 0 {
        return BTreeMap::new();
    }

    let mut triggers: BTreeMap<&str, usize> = BTreeMap::new();
    for p in packets {
        let Some(mismatch) = &p.mismatch else {
            continue;
        };
        let codes: BTreeSet<&str> = mismatch.reason_codes.iter().map(String::as_str).collect();
        for code in codes {
            *triggers.entry(code).or_insert(0) += 1;
        }
    }

    triggers
        .into_iter()
        .map(|(code, hits)| (code.to_string(), hits as f64 / total as f64))
        .collect()
}

/// Per-packet safety check: allowed actions carry no deny flags, denied
/// actions carry a mismatch. A denial with no mismatch counts as a miss here
/// even when it carries a fail-closed marker.
pub fn safety_invariant_pass_rate(packets: &[Packet]) -> f64 {
    if packets.is_empty() {
        return 1.0;
    }
    let passed = packets.iter().filter(|p| packet_is_safe(p)).count();
    passed as f64 / packets.len() as f64
}

fn packet_is_safe(p: &Packet) -> bool {
    if p.is_allowed() {
        !p.has_deny_flags()
    } else {
        p.mismatch.is_some()
    }
}

/// Nearest-rank p50/p95/p99 over packets that report a latency.
///
/// For small samples p95 and p99 are expected to equal the maximum.
pub fn latency_percentiles(packets: &[Packet]) -> LatencyPercentiles {
    let mut latencies: Vec<f64> = packets.iter().filter_map(|p| p.latency_ms).collect();
    if latencies.is_empty() {
        return LatencyPercentiles::default();
    }
    latencies.sort_by(f64::total_cmp);

    LatencyPercentiles {
        p50: nearest_rank(&latencies, 50),
        p95: nearest_rank(&latencies, 95),
        p99: nearest_rank(&latencies, 99),
    }
}

/// `sorted[floor(k/100 * n)]`, clamped to the last element. Integer math keeps
/// the index exact.
fn nearest_rank(sorted: &[f64], k: usize) -> f64 {
    let n = sorted.len();
    let idx = k * n / 100;
    sorted[idx.min(n - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FinalAction, MetricKey, Mismatch, Proposal};

    fn packet(step: u64, action: &str) -> Packet {
        Packet {
            run_id: "test-run".to_string(),
            step,
            schema_version: "0.2.2".to_string(),
            input: Default::default(),
            external: Some(Default::default()),
            mdm: Proposal {
                action: Some(action.to_string()),
                confidence: Some(0.5),
            },
            final_action: FinalAction {
                action: Some(action.to_string()),
                allowed: None,
            },
            latency_ms: Some(2.0),
            mismatch: None,
        }
    }

    fn with_latencies(values: &[f64]) -> Vec<Packet> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut p = packet(i as u64, "HOLD");
                p.latency_ms = Some(*v);
                p
            })
            .collect()
    }

    fn key_set(m: &MetricsResult) -> BTreeSet<String> {
        match serde_json::to_value(m).unwrap() {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            other => panic!("metrics serialized as {other}"),
        }
    }

    #[test]
    fn empty_input_is_vacuously_safe() {
        let m = compute_metrics(&[]);
        assert!(m.action_distribution.is_empty());
        assert!(m.guard_trigger_rates.is_empty());
        assert_eq!(m.safety_invariant_pass_rate, 1.0);
        assert_eq!(m.latency_percentiles, LatencyPercentiles::default());
        assert_eq!(m.total_steps, 0);
    }

    #[test]
    fn key_set_is_fixed_for_empty_and_non_empty_input() {
        let expected: BTreeSet<String> =
            MetricKey::ALL.iter().map(|k| k.as_str().to_string()).collect();
        let empty = compute_metrics(&[]);
        let full = compute_metrics(&[packet(0, "HOLD"), packet(1, "ACT")]);
        assert_eq!(key_set(&empty), expected);
        assert_eq!(key_set(&full), expected);
    }

    #[test]
    fn all_hold_trace_without_mismatch() {
        let packets: Vec<Packet> = (0..10).map(|s| packet(s, "HOLD")).collect();
        let m = compute_metrics(&packets);
        assert_eq!(m.action_distribution.len(), 1);
        assert_eq!(m.action_distribution["HOLD"], 10);
        assert!(m.guard_trigger_rates.is_empty());
        assert_eq!(m.safety_invariant_pass_rate, 1.0);
        assert_eq!(m.total_steps, 10);
    }

    #[test]
    fn every_fifth_step_guard_yields_point_two() {
        let packets: Vec<Packet> = (0..20)
            .map(|s| {
                let mut p = packet(s, "ACT");
                if s % 5 == 0 {
                    p.final_action.action = Some("HOLD".to_string());
                    p.mismatch = Some(Mismatch {
                        flags: vec!["exposure_limit".to_string()],
                        reason_codes: vec!["max_exposure_exceeded".to_string()],
                    });
                }
                p
            })
            .collect();
        let m = compute_metrics(&packets);
        assert_eq!(m.guard_trigger_rates.len(), 1);
        assert_eq!(m.guard_trigger_rates["max_exposure_exceeded"], 0.2);
    }

    #[test]
    fn distribution_sums_to_total_and_buckets_unknown() {
        let mut odd = packet(2, "HOLD");
        odd.final_action.action = Some("TELEPORT".to_string());
        let mut missing = packet(3, "HOLD");
        missing.final_action.action = None;
        let packets = vec![packet(0, "ACT"), packet(1, "HOLD"), odd, missing];

        let m = compute_metrics(&packets);
        assert_eq!(m.action_distribution[UNKNOWN_ACTION], 2);
        assert_eq!(m.action_distribution.values().sum::<u64>(), m.total_steps);
    }

    #[test]
    fn trigger_rate_is_k_over_n_and_counts_packets_not_mentions() {
        let mut packets: Vec<Packet> = (0..8).map(|s| packet(s, "HOLD")).collect();
        for p in packets.iter_mut().take(3) {
            p.mismatch = Some(Mismatch {
                flags: vec![],
                reason_codes: vec!["stale_quote".to_string(), "stale_quote".to_string()],
            });
        }
        let rates = guard_trigger_rates(&packets);
        assert_eq!(rates["stale_quote"], 3.0 / 8.0);
        assert!(rates.values().all(|r| (0.0..=1.0).contains(r)));
    }

    #[test]
    fn safety_rate_penalizes_denial_without_mismatch() {
        let mut flagged_allowed = packet(0, "ACT");
        flagged_allowed.mismatch = Some(Mismatch {
            flags: vec!["x".to_string()],
            reason_codes: vec![],
        });
        let mut silent_denial = packet(1, "HOLD");
        silent_denial.final_action.allowed = Some(false);
        let mut guarded_denial = packet(2, "HOLD");
        guarded_denial.final_action.allowed = Some(false);
        guarded_denial.mismatch = Some(Mismatch::default());
        let clean = packet(3, "HOLD");

        let rate =
            safety_invariant_pass_rate(&[flagged_allowed, silent_denial, guarded_denial, clean]);
        assert_eq!(rate, 0.5);
    }

    #[test]
    fn nearest_rank_small_sample_hits_max() {
        let p = latency_percentiles(&with_latencies(&[5.0, 1.0, 3.0, 2.0, 4.0]));
        assert_eq!(p.p50, 3.0);
        assert_eq!(p.p95, 5.0);
        assert_eq!(p.p99, 5.0);
    }

    #[test]
    fn nearest_rank_hundred_samples() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let p = latency_percentiles(&with_latencies(&values));
        assert_eq!(p.p50, 51.0);
        assert_eq!(p.p95, 96.0);
        assert_eq!(p.p99, 100.0);
    }

    #[test]
    fn percentiles_ignore_order_and_stay_monotone() {
        let forward = [9.0, 1.5, 7.0, 3.0, 3.0, 12.0, 0.5, 8.0, 4.0, 6.0, 2.0];
        let mut backward = forward;
        backward.reverse();
        let a = latency_percentiles(&with_latencies(&forward));
        let b = latency_percentiles(&with_latencies(&backward));
        assert_eq!(a, b);
        assert!(a.p50 <= a.p95 && a.p95 <= a.p99);
    }

    #[test]
    fn packets_without_latency_are_excluded() {
        let mut packets = with_latencies(&[10.0, 20.0]);
        let mut no_latency = packet(2, "HOLD");
        no_latency.latency_ms = None;
        packets.push(no_latency);
        let p = latency_percentiles(&packets);
        assert_eq!(p.p50, 20.0);
        assert_eq!(compute_metrics(&packets).total_steps, 3);
    }

    #[test]
    fn no_latencies_yield_zeros() {
        let mut p = packet(0, "HOLD");
        p.latency_ms = None;
        assert_eq!(latency_percentiles(&[p]), LatencyPercentiles::default());
    }
}
