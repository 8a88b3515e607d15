//! Dataset loading and train/test splitting

mod breast_cancer;
mod dataset;
mod split;

pub use breast_cancer::{load_breast_cancer, FEATURE_NAMES, TARGET_NAMES, N_FEATURES, N_SAMPLES};
pub use dataset::Dataset;
pub use split::{train_test_split, Split};
