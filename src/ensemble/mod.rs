//! Ensemble methods module
//!
//! Hard majority voting over named member classifiers.

mod voting;

pub use voting::VotingClassifier;
