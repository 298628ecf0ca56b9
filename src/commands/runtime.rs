use crate::*;
use anyhow::Context;
use std::path::PathBuf;

pub fn handle_runtime_commands(cli: &Cli, config: &EvalConfig) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Run {
            suite,
            input,
            out,
            seed,
            expected_minor,
            strict,
        } => {
            let out_dir = out.clone().unwrap_or_else(|| config.run.out_dir.clone());
            let range = match expected_minor {
                Some(minor) => ContractRange::exact_minor(config.contract.expected_major, *minor),
                None => config.contract,
            };

            let (packets, suite_name, seed) = match input {
                Some(path) => {
                    let packets = PacketReader::open(path)?.read_all()?;
                    (packets, trace_suite_name(path), None)
                }
                None => {
                    let name = suite.clone().unwrap_or_else(|| config.run.suite.clone());
                    let seed = seed.unwrap_or(config.run.seed);
                    let packets = load_fixture_suite(&name, seed)?;
                    (packets, name, Some(seed))
                }
            };

            let report = build_report_with(&packets, &suite_name, &range, seed);
            write_report(&report, &out_dir)?;

            let failed_invariants: Vec<String> = report
                .invariant_results
                .failed()
                .into_iter()
                .map(|i| i.to_string())
                .collect();
            let summary = RunSummary {
                suite_name: report.suite_name.clone(),
                out_dir: out_dir.to_string_lossy().to_string(),
                total_packets: report.input_stats.total_packets,
                contract_ok: report.contract_ok,
                invariants_passed: failed_invariants.is_empty(),
                failed_invariants,
                overall: if report.passed() { "ok" } else { "needs_attention" }.to_string(),
            };

            if cli.json {
                print_json(report.passed() || !*strict, &summary)?;
            } else {
                println!(
                    "report written to {}/{} and {}/{}",
                    summary.out_dir, REPORT_JSON, summary.out_dir, REPORT_MD
                );
                println!("suite: {}", summary.suite_name);
                println!("packets: {}", summary.total_packets);
                println!(
                    "contract: {}",
                    if summary.contract_ok { "compatible" } else { "incompatible" }
                );
                if summary.invariants_passed {
                    println!("invariants: all passed");
                } else {
                    println!("invariants failed: {}", summary.failed_invariants.join(", "));
                }
                println!("overall: {}", summary.overall);
            }

            if *strict && !report.passed() {
                ensure_compatible(&report.contract_matrix_check.schema_version, &range)?;
                anyhow::bail!(
                    "evaluation of {} needs attention (contract_ok={}, failed invariants: [{}])",
                    summary.suite_name,
                    summary.contract_ok,
                    summary.failed_invariants.join(", ")
                );
            }
        }
        Commands::Report { out } => {
            let out_dir = out.clone().unwrap_or_else(|| config.run.out_dir.clone());
            let report = rerender_markdown(&out_dir)
                .with_context(|| format!("re-render report in {}", out_dir.display()))?;
            print_one(cli.json, report.suite_name.clone(), |suite| {
                format!("re-rendered {}/{} for suite {}", out_dir.display(), REPORT_MD, suite)
            })?;
        }
        Commands::Contract {
            schema_version,
            expected_major,
            min_minor,
            max_minor,
        } => {
            let range = ContractRange {
                expected_major: expected_major.unwrap_or(config.contract.expected_major),
                min_minor: min_minor.unwrap_or(config.contract.min_minor),
                max_minor: max_minor.unwrap_or(config.contract.max_minor),
            };
            let check = check_range(schema_version, &range);
            print_one(cli.json, check, |c| {
                format!(
                    "{}\t{}\texpected {}",
                    c.schema_version,
                    if c.compatible { "compatible" } else { "incompatible" },
                    range
                )
            })?;
        }
        Commands::Suites => {
            let suites = list_suites(config.run.seed);
            print_out(cli.json, &suites, |s| {
                format!("{}\t{}\t{}", s.name, s.steps, s.description)
            })?;
        }
    }

    Ok(())
}

/// A JSONL trace is reported under its file stem.
fn trace_suite_name(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| PathBuf::from(path).to_string_lossy().to_string())
}
