use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub work: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        let work = tmp.path().join("work");
        fs::create_dir_all(&home).expect("create isolated home");
        fs::create_dir_all(&work).expect("create work dir");
        Self {
            _tmp: tmp,
            home,
            work,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("evalcal");
        cmd.env("HOME", &self.home).current_dir(&self.work);
        cmd
    }

    pub fn out_dir(&self, name: &str) -> PathBuf {
        self.work.join("reports").join(name)
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn read_report(&self, out_dir: &PathBuf) -> Value {
        let raw = fs::read_to_string(out_dir.join("report.json")).expect("read report.json");
        serde_json::from_str(&raw).expect("report.json is json")
    }

    /// Write one JSON object per line under the work dir.
    pub fn write_trace(&self, file_name: &str, packets: &[Value]) -> PathBuf {
        let path = self.work.join(file_name);
        let body: String = packets.iter().map(|p| format!("{}\n", p)).collect();
        fs::write(&path, body).expect("write trace");
        path
    }
}

pub fn packet(step: u64, action: &str) -> Value {
    serde_json::json!({
        "run_id": "e2e-run",
        "step": step,
        "schema_version": "0.2.2",
        "input": {"ts": 1000 + step},
        "external": {"mid": 0.5},
        "mdm": {"action": action, "confidence": 0.5},
        "final_action": {"action": action},
        "latency_ms": 2,
        "mismatch": null
    })
}
