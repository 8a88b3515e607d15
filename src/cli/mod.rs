//! Command-line interface
//!
//! With no flags the benchmark runs with the default configuration. Progress
//! lines go to stdout; the colored summary and logs go to stderr.

use clap::Parser;
use colored::*;
use std::path::PathBuf;

use crate::config::{BenchConfig, DatasetSource};
use crate::experiment::{format_accuracy, BenchReport};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn section(title: &str) {
    eprintln!();
    eprintln!("  {}", title.white().bold());
    eprintln!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Default)]
#[command(name = "ensemble-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grid-searched decision tree, k-NN, SVM and voting ensemble on breast-cancer data")]
#[command(long_about = None)]
pub struct Cli {
    /// Tracking store: directory, file:<dir> or http(s):// MLflow server
    #[arg(long)]
    pub tracking_uri: Option<String>,

    /// Experiment name
    #[arg(long)]
    pub experiment: Option<String>,

    /// Run name
    #[arg(long)]
    pub run_name: Option<String>,

    /// Seed for the split and the decision tree
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of cross-validation folds
    #[arg(long)]
    pub cv_folds: Option<usize>,

    /// Held-out fraction
    #[arg(long)]
    pub test_size: Option<f64>,

    /// breast_cancer.csv to use instead of the bundled dataset
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Reuse the experiment if it already exists
    #[arg(long)]
    pub reuse_experiment: bool,
}

impl Cli {
    /// Layer the flags over `base`
    pub fn apply(self, mut base: BenchConfig) -> BenchConfig {
        if let Some(uri) = self.tracking_uri {
            base = base.with_tracking_uri(uri);
        }
        if let Some(name) = self.experiment {
            base = base.with_experiment(name);
        }
        if let Some(name) = self.run_name {
            base = base.with_run_name(name);
        }
        if let Some(seed) = self.seed {
            base = base.with_seed(seed);
        }
        if let Some(folds) = self.cv_folds {
            base = base.with_cv_folds(folds);
        }
        if let Some(test_size) = self.test_size {
            base = base.with_test_size(test_size);
        }
        if let Some(path) = self.dataset {
            base = base.with_dataset(DatasetSource::Csv(path));
        }
        if self.reuse_experiment {
            base = base.with_reuse_experiment(true);
        }
        base
    }

    /// Defaults (including environment overrides) with the flags on top
    pub fn into_config(self) -> BenchConfig {
        self.apply(BenchConfig::default())
    }
}

/// Best parameters and accuracies of every classifier, on stderr
pub fn print_summary(config: &BenchConfig, report: &BenchReport) {
    section("Summary");
    eprintln!("  {}", kv("experiment", &config.experiment_name));
    eprintln!("  {}", kv("run       ", &config.run_name));
    eprintln!("  {}", kv("store     ", &config.tracking_uri));
    eprintln!();

    for c in report.iter() {
        let params = c
            .best_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        eprintln!(
            "  {} {:<8} cv {}  train {}  test {}  {}",
            ok("✓"),
            c.name.white().bold(),
            format!("{:.4}", c.best_score).cyan(),
            format!("{:.4}", c.train_acc).white(),
            format_accuracy(c.test_acc).white().bold(),
            dim(&params),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keeps_base() {
        let base = BenchConfig::default().with_experiment("ensamble_2");
        let cli = Cli::try_parse_from(["ensemble-bench"]).unwrap();
        let config = cli.apply(base.clone());

        assert_eq!(config.experiment_name, base.experiment_name);
        assert_eq!(config.seed, base.seed);
        assert!(!config.reuse_experiment);
    }

    #[test]
    fn test_flags_override() {
        let cli = Cli::try_parse_from([
            "ensemble-bench",
            "--tracking-uri",
            "http://localhost:5000",
            "--experiment",
            "exp",
            "--run-name",
            "run",
            "--seed",
            "7",
            "--cv-folds",
            "5",
            "--test-size",
            "0.25",
            "--dataset",
            "data/breast_cancer.csv",
            "--reuse-experiment",
        ])
        .unwrap();
        let config = cli.apply(BenchConfig::default());

        assert_eq!(config.tracking_uri, "http://localhost:5000");
        assert_eq!(config.experiment_name, "exp");
        assert_eq!(config.run_name, "run");
        assert_eq!(config.seed, 7);
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.test_size, 0.25);
        assert_eq!(
            config.dataset,
            DatasetSource::Csv(PathBuf::from("data/breast_cancer.csv"))
        );
        assert!(config.reuse_experiment);
    }

    #[test]
    fn test_rejects_non_numeric_seed() {
        assert!(Cli::try_parse_from(["ensemble-bench", "--seed", "abc"]).is_err());
    }
}
