//! Ordinary least squares with an intercept.

use super::{RollingEstimate, RollingKernel};
use crate::error::{CharacteristicError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

/// OLS kernel solving the normal equations.
#[derive(Debug, Clone, Copy)]
pub struct OlsKernel {
    /// Pivots below this magnitude are treated as singular
    pub tolerance: f64,
}

impl Default for OlsKernel {
    fn default() -> Self {
        Self { tolerance: 1e-12 }
    }
}

impl OlsKernel {
    /// Create a kernel with the default tolerance.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>, tolerance: f64) -> Result<Array1<f64>> {
    let n = b.len();
    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .ok_or(CharacteristicError::SingularDesign)?;
        if a[[pivot, col]].abs() < tolerance * scale {
            return Err(CharacteristicError::SingularDesign);
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

impl RollingKernel for OlsKernel {
    fn fit(&self, y: ArrayView1<'_, f64>, x: ArrayView2<'_, f64>) -> Result<RollingEstimate> {
        let n = y.len();
        if x.nrows() != n {
            return Err(CharacteristicError::DimensionMismatch {
                expected: n,
                actual: x.nrows(),
            });
        }
        let p = x.ncols() + 1;
        if n <= p {
            return Err(CharacteristicError::SingularDesign);
        }

        let mut design = Array2::<f64>::ones((n, p));
        design.slice_mut(s![.., 1..]).assign(&x);

        let xtx = design.t().dot(&design);
        let xty = design.t().dot(&y);
        let coefficients = solve(xtx, xty, self.tolerance)?;

        let residuals = &y - &design.dot(&coefficients);
        let sse = residuals.mapv(|r| r * r).sum();
        Ok(RollingEstimate {
            coefficients,
            residual_variance: sse / (n - p) as f64,
            observations: n,
        })
    }
}
