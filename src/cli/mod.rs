//! Exoplanet classification CLI
//!
//! Command-line interface for mission detection, batch prediction, the model
//! listing and the HTTP server.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::RegistryConfig;
use crate::detection::DatasetTypeDetector;
use crate::mission::Mission;
use crate::model::ModelRegistry;
use crate::pipeline::{ClassificationOutcome, ClassificationPipeline};
use crate::preprocessing::PreprocessOptions;
use crate::utils::{DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "exodiscovery")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mission-aware exoplanet candidate classification")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify every row of a survey table
    Predict {
        /// Input data file (CSV, JSON, or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Mission (kepler, k2, tess); detected from the columns when omitted
        #[arg(short, long)]
        mission: Option<String>,

        /// Output predictions file (CSV, JSON, or Parquet)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory holding `<mission>.model` artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Comma-separated columns for IQR outlier suppression (Kepler only)
        #[arg(long, value_delimiter = ',')]
        outlier_cols: Vec<String>,
    },

    /// Detect which mission a table comes from
    Detect {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Show the classifier registered for each mission
    Models {
        /// Directory holding `<mission>.model` artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },

    /// Start the API server
    Serve {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Directory holding `<mission>.model` artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
}

fn registry_config(models_dir: Option<&Path>) -> RegistryConfig {
    match models_dir {
        Some(dir) => RegistryConfig::default().with_models_dir(dir),
        None => RegistryConfig::default(),
    }
}

/// One row per prediction, ready to be written out
pub fn predictions_frame(outcome: &ClassificationOutcome) -> PolarsResult<DataFrame> {
    let n = outcome.predictions.len();
    let rows: Vec<u32> = (0..n as u32).collect();
    let missions: Vec<&str> = outcome.predictions.iter().map(|p| p.mission.as_str()).collect();
    let labels: Vec<&str> = outcome.predictions.iter().map(|p| p.label.as_str()).collect();
    let raw: Vec<i64> = outcome.predictions.iter().map(|p| p.raw_label).collect();
    let confidence: Vec<Option<f64>> = outcome.predictions.iter().map(|p| p.confidence).collect();
    let degraded: Vec<bool> = outcome.predictions.iter().map(|p| p.degraded).collect();

    DataFrame::new(vec![
        Column::new("row".into(), rows),
        Column::new("mission".into(), missions),
        Column::new("prediction".into(), labels),
        Column::new("raw_label".into(), raw),
        Column::new("confidence".into(), confidence),
        Column::new("degraded".into(), degraded),
    ])
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_predict(
    data_path: &Path,
    mission: Option<&str>,
    output: Option<&Path>,
    models_dir: Option<&Path>,
    outlier_cols: Vec<String>,
) -> anyhow::Result<()> {
    section("Predict");

    let hint = mission.map(str::parse::<Mission>).transpose()?;

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run("Loading classifiers");
    let registry = Arc::new(ModelRegistry::load(&registry_config(models_dir)));
    step_done(&format!("{} missions", registry.len()));

    step_run("Classifying");
    let start = Instant::now();
    let pipeline = ClassificationPipeline::new(registry)
        .with_options(PreprocessOptions::default().with_outlier_columns(outlier_cols));
    let outcome = pipeline.classify(&df, hint)?;
    step_done(&format!("{:?}", start.elapsed()));

    let confirmed = outcome.predictions.iter().filter(|p| p.raw_label == 1).count();
    let candidates = outcome.predictions.iter().filter(|p| p.raw_label == 0).count();

    println!();
    println!("  {:<16} {}", muted("Mission"), outcome.mission.display_name().white().bold());
    if let Some(detection) = &outcome.detection {
        if let Some(score) = detection.score_for(outcome.mission) {
            println!("  {:<16} {}", muted("Detected"), format!("{:.0}% signature overlap", score * 100.0).white());
        }
    }
    println!("  {:<16} {}", muted("Rows"), outcome.predictions.len().to_string().white());
    println!("  {:<16} {}", muted("Confirmed"), confirmed.to_string().white());
    println!("  {:<16} {}", muted("Candidate"), candidates.to_string().white());
    println!("  {:<16} {}", muted("Dropped rows"), outcome.info.rows_removed.to_string().white());
    if outcome.degraded {
        println!("  {}", "No trained classifier for this mission; predictions are defaults".yellow());
    }

    if let Some(importances) = &outcome.feature_importances {
        section("Top features");
        for (i, f) in importances.iter().take(5).enumerate() {
            println!("  {:>2}. {:<28} {:.4}", i + 1, f.feature, f.importance);
        }
    }

    if let Some(path) = output {
        step_run(&format!("Saving → {}", path.display()));
        let mut frame = predictions_frame(&outcome)?;
        DataSaver::save(&mut frame, path)?;
        step_done(&format!("{} rows", frame.height()));
    }

    println!();
    Ok(())
}

pub fn cmd_detect(data_path: &Path) -> anyhow::Result<()> {
    section("Detect");

    let df = DataLoader::new().load(data_path)?;
    let detector = DatasetTypeDetector::new();
    let report = detector.detect_report(&df);

    println!("  {:<12} {:>8} {:>10}", muted("Mission"), muted("Score"), muted("Matched"));
    println!("  {}", dim(&"─".repeat(32)));
    for score in &report.scores {
        println!(
            "  {:<12} {:>8.3} {:>10}",
            score.mission.display_name(),
            score.score,
            format!("{}/{}", score.matched, score.required)
        );
    }
    println!();

    match report.mission {
        Some(mission) => {
            let validation = detector.validate(&df, mission);
            println!("  {} {}", ok("detected"), mission.display_name().white().bold());
            println!(
                "  {:<12} {:.1}% ({} missing)",
                muted("Complete"),
                validation.completeness * 100.0,
                validation.missing_columns.len()
            );
        }
        None => {
            println!(
                "  {}",
                format!("no mission reaches {:.0}% signature overlap", report.threshold * 100.0).yellow()
            );
        }
    }

    println!();
    Ok(())
}

pub fn cmd_models(models_dir: Option<&Path>) -> anyhow::Result<()> {
    section("Models");

    let registry = ModelRegistry::load(&registry_config(models_dir));

    println!("  {:<8} {:<16} {:<10} {:>8}", muted("Mission"), muted("Type"), muted("Status"), muted("Inputs"));
    println!("  {}", dim(&"─".repeat(46)));
    for summary in registry.summaries() {
        let status = if summary.degraded { "fallback".yellow() } else { ok("fitted") };
        println!(
            "  {:<8} {:<16} {:<10} {:>8}",
            summary.mission.as_str(),
            summary.model_type,
            status,
            summary.n_features
        );
        println!("    {}", dim(&summary.source));
    }

    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: &str, port: u16, models_dir: Option<&Path>) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Exoplanet Discovery".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("API    ", &format!("http://{}:{}/api", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", host, port)));
    line_box(&kv("Models ", &format!("http://{}:{}/api/models", host, port)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig {
        host: host.to_string(),
        port,
        registry: registry_config(models_dir),
        ..Default::default()
    };

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_predict_flags() {
        let cli = Cli::parse_from([
            "exodiscovery", "predict", "-d", "koi.csv", "-m", "kepler", "--outlier-cols", "koi_period,koi_depth",
        ]);
        match cli.command {
            Some(Commands::Predict { mission, outlier_cols, .. }) => {
                assert_eq!(mission.as_deref(), Some("kepler"));
                assert_eq!(outlier_cols, vec!["koi_period", "koi_depth"]);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1mhi\x1b[0m"), "hi");
    }

    #[test]
    fn test_predictions_frame() {
        let registry = Arc::new(ModelRegistry::fallback_only());
        let df = df! { "pl_rade" => [1.0, 2.0, 3.0] }.unwrap();
        let outcome = ClassificationPipeline::new(registry).classify(&df, Some(Mission::K2)).unwrap();
        let frame = predictions_frame(&outcome).unwrap();
        assert_eq!(frame.shape(), (3, 6));
        assert_eq!(frame.column("prediction").unwrap().str().unwrap().get(0), Some("CANDIDATE"));
    }
}
