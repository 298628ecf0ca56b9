//! Synthetic fixture traces for smoke-testing the evaluator end to end.

use crate::{FinalAction, Mismatch, Packet, Proposal, SuiteInfo, SCHEMA_VERSION};
use serde_json::{json, Map, Value};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SuiteError {
    #[error("unknown fixture suite: {name}. available: {}", available.join(", "))]
    Unknown {
        name: String,
        available: Vec<String>,
    },
}

struct Suite {
    name: &'static str,
    description: &'static str,
    generate: fn(u64) -> Vec<Packet>,
}

const SUITES: &[Suite] = &[
    Suite {
        name: "smoke",
        description: "10 HOLD steps, no guard activity",
        generate: smoke,
    },
    Suite {
        name: "determinism",
        description: "20 steps, ACT on every third step else HOLD, varying latency",
        generate: determinism,
    },
    Suite {
        name: "guard_pressure",
        description: "20 steps, every fifth denied by the exposure guard",
        generate: guard_pressure,
    },
    Suite {
        name: "fault_path",
        description: "10 steps, every fourth denied by a fail-closed fault handler",
        generate: fault_path,
    },
];

pub fn suite_names() -> Vec<String> {
    SUITES.iter().map(|s| s.name.to_string()).collect()
}

pub fn list_suites(seed: u64) -> Vec<SuiteInfo> {
    SUITES
        .iter()
        .map(|s| SuiteInfo {
            name: s.name.to_string(),
            steps: (s.generate)(seed).len(),
            description: s.description.to_string(),
        })
        .collect()
}

pub fn load_fixture_suite(name: &str, seed: u64) -> Result<Vec<Packet>, SuiteError> {
    let suite = SUITES
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| SuiteError::Unknown {
            name: name.to_string(),
            available: suite_names(),
        })?;
    Ok((suite.generate)(seed))
}

fn object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

fn step_packet(run_id: &str, step: u64, seed: u64, action: &str, confidence: f64) -> Packet {
    Packet {
        run_id: run_id.to_string(),
        step,
        schema_version: SCHEMA_VERSION.to_string(),
        input: object(json!({"ts": 1000 + step * 100, "seed": seed})),
        external: Some(object(json!({"mid": 0.5}))),
        mdm: Proposal {
            action: Some(action.to_string()),
            confidence: Some(confidence),
        },
        final_action: FinalAction {
            action: Some(action.to_string()),
            allowed: None,
        },
        latency_ms: Some(2.0),
        mismatch: None,
    }
}

fn smoke(seed: u64) -> Vec<Packet> {
    (0..10)
        .map(|step| step_packet("smoke-run", step, seed, "HOLD", 0.5))
        .collect()
}

fn determinism(seed: u64) -> Vec<Packet> {
    (0..20)
        .map(|step| {
            let action = if step % 3 == 0 { "ACT" } else { "HOLD" };
            let mut p = step_packet("determinism-run", step, seed, action, 0.6);
            p.external = Some(object(json!({"mid": 0.5 + (step % 10) as f64 * 0.01})));
            p.latency_ms = Some((1 + step % 5) as f64);
            p
        })
        .collect()
}

fn guard_pressure(seed: u64) -> Vec<Packet> {
    (0..20)
        .map(|step| {
            let mut p = step_packet("guard-pressure-run", step, seed, "ACT", 0.8);
            p.latency_ms = Some(3.0);
            if step % 5 == 0 {
                p.final_action = FinalAction {
                    action: Some("HOLD".to_string()),
                    allowed: Some(false),
                };
                p.mismatch = Some(Mismatch {
                    flags: vec!["exposure_limit".to_string()],
                    reason_codes: vec!["max_exposure_exceeded".to_string()],
                });
            }
            p
        })
        .collect()
}

fn fault_path(seed: u64) -> Vec<Packet> {
    (0..10)
        .map(|step| {
            let mut p = step_packet("fault-path-run", step, seed, "ACT", 0.7);
            if step % 4 == 0 {
                p.final_action = FinalAction {
                    action: Some("HOLD".to_string()),
                    allowed: Some(false),
                };
                p.external = Some(object(json!({
                    "mid": 0.5,
                    "harness.fail_closed": true,
                    "harness.error": "upstream timeout"
                })));
            }
            p
        })
        .collect()
}
