//! Small dense equation solvers embedded in components.
//!
//! Components with implicit equations (for example a turbulent orifice that
//! must satisfy its flow law together with both node boundary conditions)
//! own an [`EquationSystemSolver`] sized to their unknowns. Each timestep they
//! run a fixed number of relaxed Newton-Raphson iterations: assemble the
//! residual `F(x)` and Jacobian `J(x)`, solve `J·Δx = F` by LU and update the
//! state vector.

pub mod equation;
pub mod error;
pub mod jacobian;

pub use equation::{DEFAULT_ITERATIONS, DEFAULT_WEIGHTS, EquationSystemSolver};
pub use error::{SolverError, SolverResult};
pub use jacobian::finite_difference_jacobian;
