//! Fixed-iteration relaxed Newton-Raphson with a dense LU solve.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::finite_difference_jacobian;
use nalgebra::{DMatrix, DVector};
use tracing::trace;

/// Newton iterations per timestep unless a component overrides it.
pub const DEFAULT_ITERATIONS: usize = 2;

/// Step scaling for iterations 1, 2, 3 and 4-onwards.
pub const DEFAULT_WEIGHTS: [f64; 4] = [1.0, 0.67, 0.5, 0.5];

/// Per-component solver for `size` unknowns.
///
/// The solver owns the Jacobian and residual storage so nothing is allocated
/// per step. Iteration `k` (1-based) applies
///
/// ```text
/// x <- x - w[min(k, 4) - 1] * J(x)^-1 F(x)
/// ```
///
/// and always runs the configured number of iterations; there is no
/// convergence test. The residual norm of the last assembled `F` is kept for
/// inspection.
#[derive(Debug, Clone)]
pub struct EquationSystemSolver {
    size: usize,
    iterations: usize,
    weights: [f64; 4],
    jacobian: DMatrix<f64>,
    residual: DVector<f64>,
    last_residual_norm: f64,
    last_iterations: usize,
}

impl EquationSystemSolver {
    pub fn new(size: usize) -> SolverResult<Self> {
        if size == 0 {
            return Err(SolverError::InvalidSetting {
                what: "equation system size must be at least 1",
            });
        }
        Ok(Self {
            size,
            iterations: DEFAULT_ITERATIONS,
            weights: DEFAULT_WEIGHTS,
            jacobian: DMatrix::zeros(size, size),
            residual: DVector::zeros(size),
            last_residual_norm: 0.0,
            last_iterations: 0,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: usize) -> SolverResult<()> {
        if iterations == 0 {
            return Err(SolverError::InvalidSetting {
                what: "newton iteration count must be at least 1",
            });
        }
        self.iterations = iterations;
        Ok(())
    }

    pub fn weights(&self) -> [f64; 4] {
        self.weights
    }

    pub fn set_weights(&mut self, weights: [f64; 4]) -> SolverResult<()> {
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(SolverError::InvalidSetting {
                what: "relaxation weights must be finite",
            });
        }
        self.weights = weights;
        Ok(())
    }

    /// Relaxation factor applied at 1-based `iteration`.
    pub fn relaxation(&self, iteration: usize) -> f64 {
        self.weights[iteration.clamp(1, 4) - 1]
    }

    /// Storage for manual assembly before [`EquationSystemSolver::step`].
    pub fn jacobian_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.jacobian
    }

    /// Storage for manual assembly before [`EquationSystemSolver::step`].
    pub fn residual_mut(&mut self) -> &mut DVector<f64> {
        &mut self.residual
    }

    /// Norm of the residual assembled in the most recent iteration.
    pub fn last_residual_norm(&self) -> f64 {
        self.last_residual_norm
    }

    /// Iterations performed by the most recent [`EquationSystemSolver::solve`].
    pub fn last_iterations(&self) -> usize {
        self.last_iterations
    }

    /// One relaxed update of `state` from the already assembled `J` and `F`.
    pub fn step(&mut self, iteration: usize, state: &mut DVector<f64>) -> SolverResult<()> {
        if state.len() != self.size {
            return Err(SolverError::Dimension {
                what: "state vector",
                expected: self.size,
                got: state.len(),
            });
        }
        if self.residual.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite {
                what: "residual",
                iteration,
            });
        }
        if self.jacobian.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite {
                what: "jacobian",
                iteration,
            });
        }

        self.last_residual_norm = self.residual.norm();

        let delta = self
            .jacobian
            .clone()
            .lu()
            .solve(&self.residual)
            .ok_or(SolverError::Singular { iteration })?;
        if delta.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::Singular { iteration });
        }

        let w = self.relaxation(iteration);
        state.axpy(-w, &delta, 1.0);
        trace!(
            iteration,
            weight = w,
            residual_norm = self.last_residual_norm,
            "newton step"
        );
        Ok(())
    }

    /// Run the configured iterations, re-assembling `F` and `J` through
    /// `assemble(x, f, j)` before each one.
    pub fn solve<A>(&mut self, state: &mut DVector<f64>, mut assemble: A) -> SolverResult<()>
    where
        A: FnMut(&DVector<f64>, &mut DVector<f64>, &mut DMatrix<f64>),
    {
        self.last_iterations = 0;
        for iteration in 1..=self.iterations {
            assemble(&*state, &mut self.residual, &mut self.jacobian);
            self.step(iteration, state)?;
            self.last_iterations = iteration;
        }
        Ok(())
    }

    /// Like [`EquationSystemSolver::solve`] for residuals without an analytic
    /// Jacobian; `J` is estimated by forward differences with step `epsilon`.
    pub fn solve_numeric<F>(
        &mut self,
        state: &mut DVector<f64>,
        residual: F,
        epsilon: f64,
    ) -> SolverResult<()>
    where
        F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    {
        self.last_iterations = 0;
        for iteration in 1..=self.iterations {
            let f = residual(&*state)?;
            if f.len() != self.size {
                return Err(SolverError::Dimension {
                    what: "residual vector",
                    expected: self.size,
                    got: f.len(),
                });
            }
            self.jacobian = finite_difference_jacobian(&*state, &f, &residual, epsilon)?;
            self.residual = f;
            self.step(iteration, state)?;
            self.last_iterations = iteration;
        }
        Ok(())
    }
}
