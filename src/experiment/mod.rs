//! End-to-end benchmark
//!
//! Stages, each consuming the previous stage's output:
//! 1. [`load_data`] → [`LoadedData`]
//! 2. [`classifiers`] → [`ClassifierSuite`]
//! 3. [`grid_search`] → [`BenchReport`]
//!
//! [`ExperimentRunner`] chains them inside one tracked run.

mod report;
mod runner;

pub use report::{format_accuracy, BenchReport, ClassifierReport, TunedModels};
pub use runner::{
    classifiers, grid_search, load_data, ClassifierSuite, ExperimentRunner, LoadedData, DT_TITLE,
    KNN_TITLE, SVM_TITLE, VOTING_TITLE,
};
