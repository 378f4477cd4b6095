//! Hydraulic domain components.

pub mod motor;
pub mod orifice;
pub mod sources;
pub mod volume;

pub use motor::HydraulicVariableDisplacementMotorQ;
pub use orifice::{HydraulicLaminarOrificeQ, HydraulicTurbulentOrificeQ};
pub use sources::{HydraulicFlowSourceQ, HydraulicPressureSourceC};
pub use volume::HydraulicVolumeC;
