//! Error types for model building and simulation.

use thiserror::Error;
use tlm_graph::GraphError;
use tlm_numeric::NumericError;
use tlm_solver::SolverError;

/// Broad category of a [`SimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Invalid topology: unknown names, bad connections, missing ports.
    Structural,
    /// Invalid settings: parameter values, timesteps, factory keys.
    Configuration,
    /// Singular or non-finite numbers during a run.
    Numerical,
    /// An operation called in the wrong lifecycle state, or an aborted run.
    Lifecycle,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorClass::Structural => "structural",
            ErrorClass::Configuration => "configuration",
            ErrorClass::Numerical => "numerical",
            ErrorClass::Lifecycle => "lifecycle",
        };
        f.write_str(s)
    }
}

/// Errors encountered while building or running a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Numeric error: {0}")]
    Numeric(#[from] NumericError),

    #[error("Unknown component: {name}")]
    UnknownComponent { name: String },

    #[error("Component {component} has no port {port}")]
    UnknownPort { component: String, port: String },

    #[error("Component {component} already has a port {port}")]
    DuplicatePort { component: String, port: String },

    #[error("Port {port} is connected outside the system; disconnect it first")]
    PortInUse { port: String },

    #[error("Required port {component}::{port} is not connected")]
    RequiredPortUnconnected { component: String, port: String },

    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Parameter {name} is already registered")]
    DuplicateParameter { name: String },

    #[error("Parameter {name} expects a {expected} value, got {got}")]
    ParameterType {
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("Parameter {name} = {value} outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Cannot parse '{value}' for parameter {name}")]
    ParseParameter { name: String, value: String },

    #[error("No component type registered as {type_name}")]
    UnknownType { type_name: String },

    #[error("Invalid timestep: {what}")]
    InvalidTimestep { what: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Cannot determine CQS type of system {system}: {what}")]
    CqsUndetermined { system: String, what: &'static str },

    #[error("{component}: {what}")]
    Lifecycle { component: String, what: String },

    #[error("{component}: {what}")]
    Numerical { component: String, what: String },

    #[error("Fatal message from {component}: {message}")]
    Fatal { component: String, message: String },

    #[error("In {component}: {source}")]
    InComponent {
        component: String,
        #[source]
        source: Box<SimError>,
    },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Category used to decide whether a run can continue.
    pub fn class(&self) -> ErrorClass {
        match self {
            SimError::Graph(_)
            | SimError::UnknownComponent { .. }
            | SimError::UnknownPort { .. }
            | SimError::DuplicatePort { .. }
            | SimError::PortInUse { .. }
            | SimError::RequiredPortUnconnected { .. }
            | SimError::CqsUndetermined { .. } => ErrorClass::Structural,

            SimError::UnknownParameter { .. }
            | SimError::DuplicateParameter { .. }
            | SimError::ParameterType { .. }
            | SimError::OutOfRange { .. }
            | SimError::ParseParameter { .. }
            | SimError::UnknownType { .. }
            | SimError::InvalidTimestep { .. }
            | SimError::InvalidArg { .. } => ErrorClass::Configuration,

            SimError::Numeric(e) => match e {
                NumericError::NonFinite { .. } | NumericError::ZeroCoefficient { .. } => {
                    ErrorClass::Numerical
                }
                NumericError::InvalidArg { .. } => ErrorClass::Configuration,
            },
            SimError::Solver(e) => match e {
                SolverError::InvalidSetting { .. } | SolverError::Dimension { .. } => {
                    ErrorClass::Configuration
                }
                _ => ErrorClass::Numerical,
            },
            SimError::Numerical { .. } => ErrorClass::Numerical,

            SimError::Lifecycle { .. } | SimError::Fatal { .. } => ErrorClass::Lifecycle,

            SimError::InComponent { source, .. } => source.class(),
        }
    }

    /// Attach the name of the component the error came from.
    pub fn in_component(self, component: &str) -> SimError {
        match self {
            already @ SimError::InComponent { .. } => already,
            other => SimError::InComponent {
                component: component.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn lifecycle(component: &str, what: impl Into<String>) -> SimError {
        SimError::Lifecycle {
            component: component.to_string(),
            what: what.into(),
        }
    }

    /// A non-finite or otherwise unusable value produced during a step.
    pub fn numerical(component: &str, what: impl Into<String>) -> SimError {
        SimError::Numerical {
            component: component.to_string(),
            what: what.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        let e = SimError::from(GraphError::ReadOnlyNode);
        assert_eq!(e.class(), ErrorClass::Structural);
        let e = SimError::from(SolverError::Singular { iteration: 1 });
        assert_eq!(e.class(), ErrorClass::Numerical);
        let e = SimError::from(NumericError::ZeroCoefficient { what: "den" });
        assert_eq!(e.class(), ErrorClass::Numerical);
        let e = SimError::from(NumericError::InvalidArg { what: "min > max" });
        assert_eq!(e.class(), ErrorClass::Configuration);
        let e = SimError::UnknownParameter { name: "k".into() };
        assert_eq!(e.class(), ErrorClass::Configuration);
        let e = SimError::lifecycle("Gain", "not initialized");
        assert_eq!(e.class(), ErrorClass::Lifecycle);
    }

    #[test]
    fn component_context_keeps_class() {
        let e = SimError::from(SolverError::Singular { iteration: 2 }).in_component("Orifice");
        assert_eq!(e.class(), ErrorClass::Numerical);
        assert!(e.to_string().starts_with("In Orifice:"));
        // Not wrapped twice.
        let e = e.in_component("Outer");
        assert!(e.to_string().starts_with("In Orifice:"));
    }
}
