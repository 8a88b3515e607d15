//! Hyperparameter search module
//!
//! Exhaustive grid search with stratified cross-validation over typed
//! parameter grids:
//! - Decision tree: criterion × max_depth
//! - k-NN: algorithm × n_neighbors
//! - SVM: kernel
//! - Voting ensemble: the product of the three, keyed `<member>__<param>`

mod search_space;
pub mod grid_search;

pub use search_space::{
    DecisionTreeGrid, DecisionTreeParams, KnnGrid, KnnParams, ParamSet, SvmGrid, SvmParams,
    VotingGrid, VotingParams,
};
pub use grid_search::{
    CandidateResult, DecisionTreeSpec, EstimatorSpec, FoldData, GridSearch, KnnSpec,
    SearchOutcome, SvmSpec, VotingSpec,
};
