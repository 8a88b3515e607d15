//! Support Vector Machine classifier
//!
//! C-SVC trained with SMO. Working pairs are chosen by maximal violation with
//! second-order gain, and the gradient is maintained incrementally so each
//! step costs one pass over the kernel matrix rows involved.
//! More than two classes are handled one-vs-rest.

use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::models::{check_xy, unique_classes, Model};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training will return an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Curvature floor for non positive-definite pairs
const TAU: f64 = 1e-12;

/// Kernel family, as chosen in a parameter grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Poly,
    Rbf,
    Sigmoid,
}

impl KernelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Poly => "poly",
            Self::Rbf => "rbf",
            Self::Sigmoid => "sigmoid",
        }
    }
}

impl Default for KernelKind {
    fn default() -> Self {
        Self::Rbf
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Self::Linear),
            "poly" => Ok(Self::Poly),
            "rbf" => Ok(Self::Rbf),
            "sigmoid" => Ok(Self::Sigmoid),
            other => Err(BenchError::InvalidParameter {
                name: "kernel".to_string(),
                value: other.to_string(),
                reason: "expected one of linear, poly, rbf, sigmoid".to_string(),
            }),
        }
    }
}

/// Kernel coefficient for poly, rbf and sigmoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// `1 / (n_features * Var(X))`, variance over every element of X
    Scale,
    /// `1 / n_features`
    Auto,
    Value(f64),
}

impl Default for Gamma {
    fn default() -> Self {
        Self::Scale
    }
}

impl Gamma {
    fn resolve(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match *self {
            Gamma::Scale => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
            Gamma::Auto => 1.0 / n_features,
            Gamma::Value(g) => g,
        }
    }
}

/// Kernel function with its coefficients resolved against the training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Polynomial kernel: K(x, y) = (γ * x · y + r)^d
    Polynomial { degree: u32, gamma: f64, coef0: f64 },
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    RBF { gamma: f64 },
    /// Sigmoid kernel: K(x, y) = tanh(γ * x · y + r)
    Sigmoid { gamma: f64, coef0: f64 },
}

impl KernelType {
    pub fn compute(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match *self {
            KernelType::Linear => a.dot(&b),
            KernelType::Polynomial { degree, gamma, coef0 } => {
                (gamma * a.dot(&b) + coef0).powi(degree.min(i32::MAX as u32) as i32)
            }
            KernelType::RBF { gamma } => {
                let norm_sq: f64 = a
                    .iter()
                    .zip(b.iter())
                    .map(|(ai, bi)| (ai - bi) * (ai - bi))
                    .sum();
                (-gamma * norm_sq).exp()
            }
            KernelType::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Kernel family
    pub kernel: KernelKind,
    /// Kernel coefficient
    pub gamma: Gamma,
    /// Polynomial degree
    pub degree: u32,
    /// Independent term of poly and sigmoid
    pub coef0: f64,
    /// Tolerance on the maximal KKT violation
    pub tol: f64,
    /// Maximum number of SMO steps per binary problem
    pub max_iter: usize,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelKind::Rbf,
            gamma: Gamma::Scale,
            degree: 3,
            coef0: 0.0,
            tol: 1e-3,
            max_iter: 200_000,
        }
    }
}

impl SVMConfig {
    fn resolve_kernel(&self, x: &Array2<f64>) -> KernelType {
        let gamma = self.gamma.resolve(x);
        match self.kernel {
            KernelKind::Linear => KernelType::Linear,
            KernelKind::Poly => KernelType::Polynomial {
                degree: self.degree,
                gamma,
                coef0: self.coef0,
            },
            KernelKind::Rbf => KernelType::RBF { gamma },
            KernelKind::Sigmoid => KernelType::Sigmoid {
                gamma,
                coef0: self.coef0,
            },
        }
    }
}

/// A single binary SVM; positive decision means the positive class
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinarySVM {
    support_vectors: Array2<f64>,
    /// alpha_i * y_i per support vector
    dual_coef: Array1<f64>,
    rho: f64,
}

impl BinarySVM {
    fn decision(&self, kernel: &KernelType, sample: ArrayView1<f64>) -> f64 {
        let mut sum = -self.rho;
        for (sv, coef) in self.support_vectors.rows().into_iter().zip(self.dual_coef.iter()) {
            sum += coef * kernel.compute(sv, sample);
        }
        sum
    }
}

/// Result of one SMO run
struct SmoSolution {
    alpha: Vec<f64>,
    rho: f64,
    iterations: usize,
    converged: bool,
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    /// Kernel with gamma fixed at fit time
    kernel: Option<KernelType>,
    /// Unique class labels
    classes: Vec<i64>,
    /// One machine for two classes, one per class otherwise
    machines: Vec<BinarySVM>,
}

impl SVMClassifier {
    /// Create a new SVM classifier
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            kernel: None,
            classes: Vec::new(),
            machines: Vec::new(),
        }
    }

    pub fn with_kernel(mut self, kernel: KernelKind) -> Self {
        self.config.kernel = kernel;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// Resolved kernel, available after fitting
    pub fn kernel(&self) -> Option<&KernelType> {
        self.kernel.as_ref()
    }

    /// Train one binary machine with labels in {-1, +1}
    fn fit_machine(&self, x: &Array2<f64>, k: &Array2<f64>, y: &[f64]) -> BinarySVM {
        let solution = solve_smo(k, y, self.config.c, self.config.tol, self.config.max_iter);
        if !solution.converged {
            debug!(
                kernel = %self.config.kernel,
                iterations = solution.iterations,
                "SMO stopped at the iteration limit before reaching tolerance"
            );
        }

        let support: Vec<usize> = solution
            .alpha
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 0.0)
            .map(|(i, _)| i)
            .collect();

        let mut support_vectors = Array2::zeros((support.len(), x.ncols()));
        let mut dual_coef = Array1::zeros(support.len());
        for (row, &idx) in support.iter().enumerate() {
            support_vectors.row_mut(row).assign(&x.row(idx));
            dual_coef[row] = solution.alpha[idx] * y[idx];
        }

        BinarySVM {
            support_vectors,
            dual_coef,
            rho: solution.rho,
        }
    }

    /// Compute kernel matrix (rows in parallel)
    fn compute_kernel_matrix(kernel: &KernelType, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (0..n).map(|j| kernel.compute(x.row(i), x.row(j))).collect())
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, val) in row.into_iter().enumerate() {
                k[[i, j]] = val;
            }
        }
        k
    }

    fn fitted_kernel(&self) -> Result<&KernelType> {
        self.kernel.as_ref().ok_or(BenchError::ModelNotFitted)
    }

    /// Decision values: the single machine's score for two classes, the winning
    /// one-vs-rest score otherwise
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let kernel = self.fitted_kernel()?;
        let scores: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                self.machines
                    .iter()
                    .map(|m| m.decision(kernel, x.row(i)))
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect();
        Ok(Array1::from_vec(scores))
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.machines.iter().map(|m| m.support_vectors.nrows()).sum()
    }
}

impl Model for SVMClassifier {
    /// Fit the classifier (binary directly, multi-class via One-vs-Rest)
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        let classes = unique_classes(y)?;
        if classes.len() < 2 {
            return Err(BenchError::InvalidInput(
                "SVM requires at least 2 distinct classes".to_string(),
            ));
        }
        if x.nrows() > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(BenchError::InvalidInput(format!(
                "Dataset has {} samples, exceeding the maximum {} for SVM kernel matrix",
                x.nrows(),
                MAX_KERNEL_MATRIX_SAMPLES
            )));
        }
        if !(self.config.c > 0.0) {
            return Err(BenchError::InvalidParameter {
                name: "C".to_string(),
                value: self.config.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let kernel = self.config.resolve_kernel(x);
        let k = Self::compute_kernel_matrix(&kernel, x);

        let positives: Vec<i64> = if classes.len() == 2 {
            vec![classes[1]]
        } else {
            classes.clone()
        };
        let machines = positives
            .iter()
            .map(|&cls| {
                let y_binary: Vec<f64> = y
                    .iter()
                    .map(|&v| if v.round() as i64 == cls { 1.0 } else { -1.0 })
                    .collect();
                self.fit_machine(x, &k, &y_binary)
            })
            .collect();

        self.classes = classes;
        self.machines = machines;
        self.kernel = Some(kernel);
        Ok(())
    }

    /// Predict class labels (binary and multi-class)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let kernel = self.fitted_kernel()?;
        let classes = &self.classes;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let sample = x.row(i);
                if let [machine] = self.machines.as_slice() {
                    if machine.decision(kernel, sample) > 0.0 {
                        classes[1] as f64
                    } else {
                        classes[0] as f64
                    }
                } else {
                    let mut best_score = f64::NEG_INFINITY;
                    let mut best_class = classes[0];
                    for (m, &cls) in self.machines.iter().zip(classes.iter()) {
                        let score = m.decision(kernel, sample);
                        if score > best_score {
                            best_score = score;
                            best_class = cls;
                        }
                    }
                    best_class as f64
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// Dual C-SVC solver: minimise ½αᵀQα - eᵀα with 0 ≤ α ≤ C, yᵀα = 0,
/// where Q_ij = y_i y_j K_ij.
fn solve_smo(k: &Array2<f64>, y: &[f64], c: f64, tol: f64, max_iter: usize) -> SmoSolution {
    let n = y.len();
    let mut alpha = vec![0.0; n];
    let mut grad = vec![-1.0; n];
    let mut iterations = 0;
    let mut converged = false;

    let at_upper = |a: f64| a >= c;
    let at_lower = |a: f64| a <= 0.0;

    while iterations < max_iter {
        // i: maximal violator in the "up" set
        let mut gmax = f64::NEG_INFINITY;
        let mut i_sel = None;
        for t in 0..n {
            let v = if y[t] > 0.0 {
                if at_upper(alpha[t]) { continue; }
                -grad[t]
            } else {
                if at_lower(alpha[t]) { continue; }
                grad[t]
            };
            if v >= gmax {
                gmax = v;
                i_sel = Some(t);
            }
        }

        // j: largest second-order decrease in the "low" set
        let mut gmax2 = f64::NEG_INFINITY;
        let mut j_sel = None;
        let mut obj_min = f64::INFINITY;
        if let Some(i) = i_sel {
            for t in 0..n {
                let yg = if y[t] > 0.0 {
                    if at_lower(alpha[t]) { continue; }
                    grad[t]
                } else {
                    if at_upper(alpha[t]) { continue; }
                    -grad[t]
                };
                gmax2 = gmax2.max(yg);
                let grad_diff = gmax + yg;
                if grad_diff > 0.0 {
                    let quad = k[[i, i]] + k[[t, t]] - 2.0 * k[[i, t]];
                    let obj = -(grad_diff * grad_diff) / if quad > 0.0 { quad } else { TAU };
                    if obj <= obj_min {
                        obj_min = obj;
                        j_sel = Some(t);
                    }
                }
            }
        }

        let (i, j) = match (i_sel, j_sel) {
            (Some(i), Some(j)) if gmax + gmax2 >= tol => (i, j),
            _ => {
                converged = true;
                break;
            }
        };
        iterations += 1;

        let old_ai = alpha[i];
        let old_aj = alpha[j];
        let kij = k[[i, j]];

        if y[i] != y[j] {
            let quad = k[[i, i]] + k[[j, j]] - 2.0 * kij;
            let quad = if quad > 0.0 { quad } else { TAU };
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let quad = k[[i, i]] + k[[j, j]] - 2.0 * kij;
            let quad = if quad > 0.0 { quad } else { TAU };
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let d_i = alpha[i] - old_ai;
        let d_j = alpha[j] - old_aj;
        for t in 0..n {
            grad[t] += y[t] * (y[i] * k[[t, i]] * d_i + y[j] * k[[t, j]] * d_j);
        }
    }

    SmoSolution {
        rho: compute_rho(&alpha, &grad, y, c),
        alpha,
        iterations,
        converged,
    }
}

/// Offset from the free support vectors, or the middle of the feasible interval
fn compute_rho(alpha: &[f64], grad: &[f64], y: &[f64], c: f64) -> f64 {
    let mut ub = f64::INFINITY;
    let mut lb = f64::NEG_INFINITY;
    let mut n_free = 0usize;
    let mut sum_free = 0.0;

    for t in 0..alpha.len() {
        let yg = y[t] * grad[t];
        if alpha[t] >= c {
            if y[t] < 0.0 { ub = ub.min(yg) } else { lb = lb.max(yg) }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 { ub = ub.min(yg) } else { lb = lb.max(yg) }
        } else {
            n_free += 1;
            sum_free += yg;
        }
    }

    if n_free > 0 {
        sum_free / n_free as f64
    } else {
        (ub + lb) / 2.0
    }
}
