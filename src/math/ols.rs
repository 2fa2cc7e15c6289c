//! Ordinary least squares with classical inference.
//!
//! We solve
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! through the thin SVD `X = U Σ V^T`:
//! - `β = V Σ^-1 U^T y`
//! - `(X^T X)^-1 = V Σ^-2 V^T`, which gives the coefficient covariance.
//!
//! The numerical rank is checked first. A rank-deficient design has no unique
//! solution and is reported as such instead of being silently pseudo-inverted.

use nalgebra::{DMatrix, DVector};

/// Why a design cannot be estimated.
#[derive(Debug, Clone, PartialEq)]
pub enum OlsError {
    /// Fewer observations than coefficients (or exactly as many: no residual df).
    TooFewObservations { n: usize, p: usize },
    /// Numerical rank below the number of columns.
    RankDeficient { rank: usize, p: usize },
    /// The decomposition did not produce usable factors.
    Numerical(String),
}

impl std::fmt::Display for OlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OlsError::TooFewObservations { n, p } => {
                write!(f, "{n} observations for {p} coefficients leaves no residual degrees of freedom")
            }
            OlsError::RankDeficient { rank, p } => {
                write!(f, "design matrix has rank {rank} < {p} columns")
            }
            OlsError::Numerical(msg) => write!(f, "{msg}"),
        }
    }
}

/// Raw least-squares output; model-level statistics are derived from it in `fit`.
#[derive(Debug, Clone)]
pub struct OlsSolution {
    pub beta: DVector<f64>,
    /// `(X^T X)^-1`.
    pub xtx_inv: DMatrix<f64>,
    pub fitted: DVector<f64>,
    pub residuals: DVector<f64>,
    pub rank: usize,
}

/// Numerical rank of `x` using the usual `max(n, p) · ε · σ_max` cutoff.
pub fn numerical_rank(singular_values: &DVector<f64>, n: usize, p: usize) -> usize {
    let s_max = singular_values.iter().copied().fold(0.0_f64, f64::max);
    let tol = s_max * (n.max(p) as f64) * f64::EPSILON;
    singular_values.iter().filter(|&&s| s > tol).count()
}

/// Solve a full-rank least squares problem.
pub fn solve_ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsSolution, OlsError> {
    let (n, p) = x.shape();
    if p == 0 || n <= p {
        return Err(OlsError::TooFewObservations { n, p });
    }
    if y.len() != n {
        return Err(OlsError::Numerical(format!(
            "response has {} rows, design has {n}",
            y.len()
        )));
    }

    let svd = x.clone().svd(true, true);
    let rank = numerical_rank(&svd.singular_values, n, p);
    if rank < p {
        return Err(OlsError::RankDeficient { rank, p });
    }

    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| OlsError::Numerical("SVD did not return U".into()))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| OlsError::Numerical("SVD did not return V^T".into()))?;

    // β = V Σ^-1 U^T y
    let mut uty = u.transpose() * y;
    for (j, s) in svd.singular_values.iter().enumerate() {
        uty[j] /= *s;
    }
    let beta = v_t.transpose() * uty;

    // (X^T X)^-1 = V Σ^-2 V^T
    let mut scaled_vt = v_t.clone();
    for (j, s) in svd.singular_values.iter().enumerate() {
        let inv = 1.0 / s;
        scaled_vt.row_mut(j).scale_mut(inv);
    }
    let xtx_inv = scaled_vt.transpose() * &scaled_vt;

    if beta.iter().any(|v| !v.is_finite()) {
        return Err(OlsError::Numerical("non-finite coefficient estimate".into()));
    }

    let fitted = x * &beta;
    let residuals = y - &fitted;

    Ok(OlsSolution {
        beta,
        xtx_inv,
        fitted,
        residuals,
        rank,
    })
}
