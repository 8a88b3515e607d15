//! Results of a benchmark run

use serde::Serialize;

use crate::ensemble::VotingClassifier;
use crate::error::Result;
use crate::tracking::ParamSink;
use crate::training::{DecisionTree, KNNClassifier, SVMClassifier};

/// Tuning outcome of one classifier
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierReport {
    /// Short name, the prefix of tracked keys (`dt`, `knn`, `svm`, `voting`)
    pub name: String,
    /// Heading printed before the accuracies
    pub title: String,
    /// Winning hyperparameters as `(key, value)` pairs
    pub best_params: Vec<(String, String)>,
    /// Mean cross-validation accuracy of the winner
    pub best_score: f64,
    pub train_acc: f64,
    pub test_acc: f64,
    pub n_candidates: usize,
}

impl ClassifierReport {
    /// `Train acc: ...` and `Test acc: ...` lines
    pub fn accuracy_lines(&self) -> String {
        format!(
            "Train acc: {}\nTest acc: {}",
            format_accuracy(self.train_acc),
            format_accuracy(self.test_acc)
        )
    }

    /// Best params as `<name>_best_<key>` and accuracies as
    /// `<name>_train_acc` / `<name>_test_acc`
    pub fn record(&self, sink: &mut impl ParamSink) -> Result<()> {
        for (key, value) in &self.best_params {
            sink.log_param(&format!("{}_best_{}", self.name, key), value)?;
        }
        sink.log_metric(&format!("{}_train_acc", self.name), self.train_acc)?;
        sink.log_metric(&format!("{}_test_acc", self.name), self.test_acc)?;
        Ok(())
    }
}

/// Shortest round-trip form, always with a fractional part (`1.0`, `0.9473684210526315`)
pub fn format_accuracy(value: f64) -> String {
    format!("{:?}", value)
}

/// Tuned models, refitted on the full training split
#[derive(Debug)]
pub struct TunedModels {
    pub dt: DecisionTree,
    pub knn: KNNClassifier,
    pub svm: SVMClassifier,
    pub voting: VotingClassifier,
}

/// Reports of the four classifiers in run order
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub classifiers: Vec<ClassifierReport>,
    #[serde(skip)]
    pub models: TunedModels,
}

impl BenchReport {
    pub fn get(&self, name: &str) -> Option<&ClassifierReport> {
        self.classifiers.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassifierReport> {
        self.classifiers.iter()
    }

    /// Report as pretty JSON, without the models
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
