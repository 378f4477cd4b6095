//! Forward-difference estimate of a residual's Jacobian.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};

/// Estimate `J = dF/dx` around `x`, reusing `f_x = F(x)`.
///
/// Unknowns in a component span very different scales (flows near 1e-4,
/// pressures near 1e7), so the step for `x[j]` is `epsilon * max(|x[j]|, 1)`.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    residual: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(SolverError::InvalidSetting {
            what: "difference step must be positive",
        });
    }
    let mut jacobian = DMatrix::zeros(f_x.len(), x.len());
    let mut shifted = x.clone();
    for j in 0..x.len() {
        let h = epsilon * x[j].abs().max(1.0);
        shifted[j] = x[j] + h;
        let column = (residual(&shifted)? - f_x) / h;
        jacobian.set_column(j, &column);
        shifted[j] = x[j];
    }
    Ok(jacobian)
}
