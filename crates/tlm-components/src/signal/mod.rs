//! Signal domain components.

pub mod dynamics;
pub mod math;
pub mod pid;
pub mod sources;

pub use dynamics::{SignalFirstOrderFilter, SignalIntegrator};
pub use math::{SignalGain, SignalSum};
pub use pid::SignalPid;
pub use sources::{SignalConstant, SignalSink, SignalStep};
