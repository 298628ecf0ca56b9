//! Batch-level invariants over a whole trace.
//!
//! Each invariant holds only if it holds for every packet; one bad packet fails
//! it for the run. Every invariant is always evaluated against the full
//! sequence, and every offending packet is recorded as a violation.

use crate::{
    Action, FailClosedRule, Invariant, InvariantVerdicts, InvariantViolation, Packet,
    FAIL_CLOSED_MARKER,
};

#[derive(Debug, Clone, PartialEq)]
pub struct InvariantOutcome {
    pub verdicts: InvariantVerdicts,
    pub violations: Vec<InvariantViolation>,
}

pub fn check_invariants(packets: &[Packet]) -> InvariantVerdicts {
    check_invariants_detailed(packets).verdicts
}

pub fn check_invariants_detailed(packets: &[Packet]) -> InvariantOutcome {
    let mut violations = Vec::new();
    for p in packets {
        if let Some(detail) = contract_closure_violation(p) {
            violations.push(violation(p, Invariant::ContractClosure, None, detail));
        }
        if let Some(detail) = confidence_clamp_violation(p) {
            violations.push(violation(p, Invariant::ConfidenceClamp, None, detail));
        }
        for (rule, detail) in fail_closed_violations(p) {
            violations.push(violation(p, Invariant::FailClosed, Some(rule), detail));
        }
        if p.schema_version.is_empty() {
            violations.push(violation(
                p,
                Invariant::PacketVersion,
                None,
                "schema_version is empty".to_string(),
            ));
        }
    }

    let verdicts = InvariantVerdicts::from_fn(|inv| violations.iter().all(|v| v.invariant != inv));
    for inv in verdicts.failed() {
        let count = violations.iter().filter(|v| v.invariant == inv).count();
        tracing::warn!(invariant = %inv, violations = count, "invariant failed");
    }

    InvariantOutcome {
        verdicts,
        violations,
    }
}

fn violation(
    p: &Packet,
    invariant: Invariant,
    rule: Option<FailClosedRule>,
    detail: String,
) -> InvariantViolation {
    InvariantViolation {
        invariant,
        rule,
        run_id: p.run_id.clone(),
        step: p.step,
        detail,
    }
}

fn contract_closure_violation(p: &Packet) -> Option<String> {
    let outside = |a: &Option<String>| a.as_deref().and_then(Action::parse).is_none();
    let mut bad = Vec::new();
    if outside(&p.mdm.action) {
        bad.push(format!("mdm.action={}", describe(&p.mdm.action)));
    }
    if outside(&p.final_action.action) {
        bad.push(format!(
            "final_action.action={}",
            describe(&p.final_action.action)
        ));
    }
    if bad.is_empty() {
        None
    } else {
        Some(format!("action outside enumeration: {}", bad.join(", ")))
    }
}

fn describe(action: &Option<String>) -> String {
    match action {
        Some(a) => format!("{:?}", a),
        None => "<missing>".to_string(),
    }
}

fn confidence_clamp_violation(p: &Packet) -> Option<String> {
    let confidence = p.mdm.confidence?;
    if (0.0..=1.0).contains(&confidence) {
        None
    } else {
        Some(format!("mdm.confidence={} outside [0, 1]", confidence))
    }
}

/// Both fail-closed sub-rules, reported separately so a regression in one is
/// visible on its own.
fn fail_closed_violations(p: &Packet) -> Vec<(FailClosedRule, String)> {
    let mut out = Vec::new();
    if !deny_flags_block(p) {
        out.push((
            FailClosedRule::DenyFlagsBlock,
            "mismatch carries deny flags but final action is allowed".to_string(),
        ));
    }
    if !fault_path_marker(p) {
        out.push((
            FailClosedRule::FaultPathMarker,
            "denied without mismatch and no fail_closed marker in external".to_string(),
        ));
    }
    out
}

pub fn fail_closed_holds(p: &Packet) -> bool {
    deny_flags_block(p) && fault_path_marker(p)
}

/// Deny flags present => the final action is not allowed.
pub fn deny_flags_block(p: &Packet) -> bool {
    !(p.has_deny_flags() && p.is_allowed())
}

/// Denied with no mismatch => `external` carries a fail-closed marker key.
pub fn fault_path_marker(p: &Packet) -> bool {
    if p.is_allowed() || p.mismatch.is_some() {
        return true;
    }
    p.external
        .as_ref()
        .is_some_and(|ext| ext.keys().any(|k| is_fail_closed_marker(k)))
}

fn is_fail_closed_marker(key: &str) -> bool {
    key == FAIL_CLOSED_MARKER
        || key
            .strip_suffix(FAIL_CLOSED_MARKER)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
