//! Discrete-time numerical primitives shared by all components.
//!
//! Everything here runs at a fixed timestep and keeps its history in [`Delay`]
//! buffers:
//! - [`Delay`]: N-step ring buffer
//! - [`FirstOrderFilter`]: bilinear (Tustin) first order transfer function with
//!   output saturation and anti-windup
//! - [`Integrator`]: trapezoidal integrator
//! - [`DoubleIntegratorWithDamping`]: damped velocity/position integrator with a
//!   tentative-step API for limit checks
//!
//! Time is passed explicitly to the `update` calls that must run at most once
//! per simulation step; nothing holds a reference to the simulation clock.

pub mod delay;
pub mod error;
pub mod filter;
pub mod integrator;

pub use delay::Delay;
pub use error::{NumericError, NumericResult};
pub use filter::FirstOrderFilter;
pub use integrator::{DampedState, DoubleIntegratorWithDamping, Integrator};
