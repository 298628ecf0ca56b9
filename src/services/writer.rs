use crate::{Report, REPORT_JSON, REPORT_MD};
use anyhow::Context;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

pub fn write_report(report: &Report, out_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir {}", out_dir.display()))?;
    let json_path = out_dir.join(REPORT_JSON);
    std::fs::write(&json_path, serde_json::to_string_pretty(report)? + "\n")
        .with_context(|| format!("write {}", json_path.display()))?;
    let md_path = write_markdown(report, out_dir)?;
    tracing::info!(
        json = %json_path.display(),
        markdown = %md_path.display(),
        "report written"
    );
    Ok(())
}

pub fn load_report(out_dir: &Path) -> anyhow::Result<Report> {
    let path = out_dir.join(REPORT_JSON);
    let raw =
        std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Rewrite `report.md` from the `report.json` already in `out_dir`.
pub fn rerender_markdown(out_dir: &Path) -> anyhow::Result<Report> {
    let report = load_report(out_dir)?;
    write_markdown(&report, out_dir)?;
    Ok(report)
}

fn write_markdown(report: &Report, out_dir: &Path) -> anyhow::Result<PathBuf> {
    let path = out_dir.join(REPORT_MD);
    std::fs::write(&path, format_markdown(report)?)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn status(ok: bool) -> &'static str {
    if ok {
        "✅ PASS"
    } else {
        "❌ FAIL"
    }
}

pub fn format_markdown(report: &Report) -> Result<String, fmt::Error> {
    let mut md = String::new();
    render_markdown(&mut md, report)?;
    Ok(md)
}

fn render_markdown(md: &mut String, report: &Report) -> fmt::Result {
    let m = &report.metrics;

    writeln!(md, "# Evaluation Report\n")?;
    writeln!(md, "**Report Version**: {}", report.report_version)?;
    writeln!(md, "**Schema Version**: {}", report.schema_version)?;
    writeln!(md, "**Suite**: {}", report.suite_name)?;
    if let Some(seed) = report.seed {
        writeln!(md, "**Seed**: {}", seed)?;
    }
    writeln!(md, "**Overall**: {}\n", status(report.passed()))?;

    writeln!(md, "## Input Statistics\n")?;
    writeln!(md, "- **total_packets**: {}", report.input_stats.total_packets)?;
    writeln!(md, "- **distinct_runs**: {}", report.input_stats.distinct_runs)?;
    writeln!(md, "- **input_sha256**: `{}`", report.input_stats.input_sha256)?;
    if !report.packet_versions.is_empty() {
        writeln!(
            md,
            "- **packet_versions**: {}",
            report.packet_versions.join(", ")
        )?;
    }

    writeln!(md, "\n## Metrics\n")?;
    writeln!(md, "**Total Steps**: {}\n", m.total_steps)?;

    writeln!(md, "### Action Distribution\n")?;
    for (action, count) in &m.action_distribution {
        writeln!(md, "- {}: {}", action, count)?;
    }
    writeln!(md)?;

    writeln!(md, "### Guard Trigger Rates\n")?;
    if m.guard_trigger_rates.is_empty() {
        writeln!(md, "- none")?;
    }
    for (code, rate) in &m.guard_trigger_rates {
        writeln!(md, "- {}: {:.3}", code, rate)?;
    }
    writeln!(md)?;

    writeln!(
        md,
        "### Safety Invariant Pass Rate: {:.3}\n",
        m.safety_invariant_pass_rate
    )?;

    let lat = &m.latency_percentiles;
    writeln!(md, "### Latency Percentiles\n")?;
    writeln!(md, "- p50: {:.1}ms", lat.p50)?;
    writeln!(md, "- p95: {:.1}ms", lat.p95)?;
    writeln!(md, "- p99: {:.1}ms\n", lat.p99)?;

    let check = &report.contract_matrix_check;
    writeln!(md, "## Contract Matrix Check\n")?;
    writeln!(md, "**Status**: {}", status(check.compatible))?;
    writeln!(md, "**Schema Version**: {}", check.schema_version)?;
    writeln!(
        md,
        "**Expected Range**: {major}.{min}.x – {major}.{max}.x\n",
        major = check.expected_major,
        min = check.min_minor,
        max = check.max_minor
    )?;

    writeln!(md, "## Invariant Results\n")?;
    for (invariant, passed) in report.invariant_results.iter() {
        writeln!(md, "- {}: {}", invariant, status(passed))?;
    }

    if !report.invariant_violations.is_empty() {
        writeln!(md, "\n## Invariant Violations\n")?;
        writeln!(md, "| invariant | rule | run | step | detail |")?;
        writeln!(md, "|---|---|---|---|---|")?;
        for v in &report.invariant_violations {
            writeln!(
                md,
                "| {} | {} | {} | {} | {} |",
                v.invariant,
                v.rule.map(|r| r.as_str()).unwrap_or("-"),
                v.run_id,
                v.step,
                v.detail.replace('|', "\\|")
            )?;
        }
    }

    Ok(())
}
