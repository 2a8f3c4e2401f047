//! Stackfold CLI Module
//!
//! Command-line interface for inspecting a dataset and running a
//! train/test/simulate cycle over chronological date ranges.

use clap::{Args, Parser, Subcommand};
use chrono::{NaiveDate, NaiveDateTime};
use colored::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::dataset::{
    annotate_timestamps, monthly_counts, parse_timestamp, DataLoader, DatasetMetadata, DateRanges,
    Period, Record,
};
use crate::pipeline::{PipelineConfig, TrainingOrchestrator};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(230, 110, 110) }

fn kv(key: &str, val: &str) {
    println!("  {:<14} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn step_failed(detail: &str) {
    println!("{} {}", bad("failed"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "stackfold")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Out-of-fold stacking ensemble for pass/fail inspection")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show dataset metadata and monthly record counts
    Info {
        /// Input data file (CSV or JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Train on one period, test on the next, then simulate the last
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Input data file (CSV or JSON)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Training period start (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub train_start: String,

    /// Training period end
    #[arg(long)]
    pub train_end: String,

    /// Testing period start
    #[arg(long)]
    pub test_start: String,

    /// Testing period end
    #[arg(long)]
    pub test_end: String,

    /// Simulation period start
    #[arg(long)]
    pub sim_start: String,

    /// Simulation period end
    #[arg(long)]
    pub sim_end: String,

    /// Pass threshold on the stacked probability [default: from config, 0.7]
    #[arg(short, long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Downsample the majority class before training
    #[arg(long)]
    pub downsample: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be in [0, 1], got {}", value))
    }
}

/// Parse a period bound. A date-only end bound covers the whole day.
pub fn parse_bound(s: &str, is_end: bool) -> anyhow::Result<NaiveDateTime> {
    let trimmed = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let time = if is_end { date.and_hms_opt(23, 59, 59) } else { date.and_hms_opt(0, 0, 0) };
        return time.ok_or_else(|| anyhow::anyhow!("Invalid date: {}", s));
    }
    Ok(parse_timestamp(trimmed)?)
}

impl RunArgs {
    pub fn date_ranges(&self) -> anyhow::Result<DateRanges> {
        let period = |start: &str, end: &str| -> anyhow::Result<Period> {
            Ok(Period::new(parse_bound(start, false)?, parse_bound(end, true)?))
        };
        Ok(DateRanges {
            training: period(&self.train_start, &self.train_end)?,
            testing: period(&self.test_start, &self.test_end)?,
            simulation: period(&self.sim_start, &self.sim_end)?,
        })
    }
}

// ─── Data loading ──────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => Ok(PipelineConfig::from_json_file(path)?),
        None => Ok(PipelineConfig::default()),
    }
}

/// Load rows and give them synthetic timestamps when they carry none
pub fn load_records(path: &Path, timestamp_column: &str) -> anyhow::Result<Vec<Record>> {
    let mut rows = DataLoader::new().load(path)?;
    if annotate_timestamps(&mut rows, timestamp_column) {
        tracing::info!(rows = rows.len(), column = timestamp_column, "Added synthetic timestamps");
    }
    Ok(rows)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let ts_col = &config.preparer.timestamp_column;

    section("Data Info");

    let rows = load_records(data_path, ts_col)?;
    let metadata = DatasetMetadata::from_rows(&rows, &config.preparer.target_column, ts_col)?;

    let bound = |ts: Option<NaiveDateTime>| ts.map(|t| t.to_string()).unwrap_or_else(|| "-".into());
    kv("File", &data_path.display().to_string());
    kv("Rows", &metadata.total_records.to_string());
    kv("Columns", &metadata.total_columns.to_string());
    kv("Pass rate", &format!("{:.2}%", metadata.pass_rate * 100.0));
    kv("First record", &bound(metadata.start_timestamp));
    kv("Last record", &bound(metadata.end_timestamp));

    section("Records per month");
    for count in monthly_counts(&rows, ts_col) {
        println!("  {:<14} {:>8}", muted(&count.month), count.records);
    }

    println!();
    Ok(())
}

pub fn cmd_run(args: &RunArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let ts_col = config.preparer.timestamp_column.clone();
    let threshold = args.threshold.unwrap_or(config.default_threshold);

    section("Run");

    step_run("Loading data");
    let start = Instant::now();
    let rows = load_records(&args.data, &ts_col)?;
    step_done(&format!("{} rows in {:?}", rows.len(), start.elapsed()));

    step_run("Validating date ranges");
    let ranges = args.date_ranges()?;
    let report = ranges.validate(&rows, &ts_col);
    if !report.is_valid() {
        step_failed(&report.message);
        emit(&json!({ "ranges": report }), args.output.as_deref())?;
        anyhow::bail!(report.message);
    }
    step_done(&format!(
        "{} / {} / {} records",
        report.training.records, report.testing.records, report.simulation.records
    ));

    let train_rows = ranges.training.slice(&rows, &ts_col);
    let test_rows = ranges.testing.slice(&rows, &ts_col);
    let sim_rows = ranges.simulation.slice(&rows, &ts_col);

    step_run(&format!("Training stack at threshold {}", threshold.to_string().cyan()));
    let start = Instant::now();
    let orchestrator = TrainingOrchestrator::new(config);
    let training = orchestrator.train(&train_rows, &test_rows, threshold, args.downsample)?;
    if !training.is_success() {
        step_failed(&training.message);
        emit(&json!({ "ranges": report, "training": training }), args.output.as_deref())?;
        anyhow::bail!(training.message);
    }
    step_done(&format!("{:?}", start.elapsed()));

    step_run("Simulating");
    let simulation = orchestrator.simulate(&sim_rows)?;
    step_done(&simulation.message);

    section("Test metrics");
    kv("Accuracy", &format!("{:.4}", training.accuracy));
    kv("Precision", &format!("{:.4}", training.precision));
    kv("Recall", &format!("{:.4}", training.recall));
    kv("F1", &format!("{:.4}", training.f1_score));
    kv("Features", &training.features.len().to_string());

    section("Simulation");
    kv("Total", &simulation.stats.total.to_string());
    kv("Pass", &simulation.stats.pass.to_string());
    kv("Fail", &simulation.stats.fail.to_string());
    kv("Avg confidence", &format!("{:.2}%", simulation.stats.average_confidence));
    println!();

    emit(
        &json!({ "ranges": report, "training": training, "simulation": simulation }),
        args.output.as_deref(),
    )
}

fn emit(report: &serde_json::Value, output: Option<&Path>) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("  {} report written to {}", ok("✓"), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_only_end_covers_whole_day() {
        let start = parse_bound("2021-01-02", false).unwrap();
        let end = parse_bound("2021-01-02", true).unwrap();
        assert_eq!(start.to_string(), "2021-01-02 00:00:00");
        assert_eq!(end.to_string(), "2021-01-02 23:59:59");

        let exact = parse_bound("2021-01-02 10:30:00", true).unwrap();
        assert_eq!(exact.to_string(), "2021-01-02 10:30:00");
        assert!(parse_bound("02/01/2021", false).is_err());
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "stackfold", "run", "--data", "data.csv",
            "--train-start", "2021-01-01", "--train-end", "2021-01-10",
            "--test-start", "2021-01-11", "--test-end", "2021-01-15",
            "--sim-start", "2021-01-16", "--sim-end", "2021-01-20",
            "--downsample",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.downsample);
        assert_eq!(args.threshold, None);
        let ranges = args.date_ranges().unwrap();
        assert_eq!(ranges.training.end.to_string(), "2021-01-10 23:59:59");
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let parsed = Cli::try_parse_from([
            "stackfold", "run", "--data", "d.csv",
            "--train-start", "2021-01-01", "--train-end", "2021-01-02",
            "--test-start", "2021-01-03", "--test-end", "2021-01-04",
            "--sim-start", "2021-01-05", "--sim-end", "2021-01-06",
            "--threshold", "1.5",
        ]);
        assert!(parsed.is_err());
    }
}
