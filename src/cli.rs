use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "evalcal",
    version,
    about = "Replay decision traces and evaluate metrics, invariants and contract compatibility"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        help = "Config file (default: ~/.config/evalcal/config.toml)"
    )]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a fixture suite or a JSONL trace and write the report
    Run {
        #[arg(long, help = "Fixture suite name (ignored when --in is given)")]
        suite: Option<String>,
        #[arg(long = "in", value_name = "FILE", help = "Input JSONL trace")]
        input: Option<PathBuf>,
        #[arg(long, help = "Output directory")]
        out: Option<PathBuf>,
        #[arg(long, help = "Fixture seed")]
        seed: Option<u64>,
        #[arg(long, help = "Accept exactly this schema minor (sets min and max)")]
        expected_minor: Option<u64>,
        #[arg(
            long,
            default_value_t = false,
            help = "Exit non-zero when the contract is incompatible or an invariant fails"
        )]
        strict: bool,
    },
    /// Re-render report.md from an existing report.json
    Report {
        #[arg(long, help = "Directory holding report.json")]
        out: Option<PathBuf>,
    },
    /// Check a schema version against the accepted range
    Contract {
        #[arg(long = "schema-version", value_name = "MAJOR.MINOR.PATCH")]
        schema_version: String,
        #[arg(long)]
        expected_major: Option<u64>,
        #[arg(long)]
        min_minor: Option<u64>,
        #[arg(long)]
        max_minor: Option<u64>,
    },
    /// List fixture suites
    Suites,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
