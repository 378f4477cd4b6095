//! Rotational mechanics.

pub mod spring;

pub use spring::MechanicTorsionalSpringC;
