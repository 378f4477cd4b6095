//! tlm-sim: components, hierarchical systems and the stepping loop.
//!
//! Provides:
//! - The [`Component`] trait and the state shared by every component ([`ComponentCore`])
//! - Typed parameters ([`ParameterSet`])
//! - [`ComponentSystem`]: model building, connection checks, C/Q/S ordering,
//!   subsystems with their own timestep and concurrent stepping of
//!   independent subsystems
//! - The component registry ([`ComponentFactory`]) and the message channel
//!   ([`MessageHandler`])
//!
//! # Example
//!
//! ```
//! use tlm_sim::{ComponentFactory, ComponentSystem, register_subsystem};
//! use tlm_graph::NodeType;
//!
//! let mut factory = ComponentFactory::new();
//! register_subsystem(&mut factory);
//!
//! let mut root = ComponentSystem::new("Root");
//! let sub = root.add_new(&mut factory, "Subsystem", "Sub").unwrap();
//! let port = root
//!     .subsystem_mut(&sub)
//!     .unwrap()
//!     .add_system_port("in", NodeType::Signal)
//!     .unwrap();
//! assert_eq!(port, "in");
//! assert_eq!(root.component_names(), vec!["Sub"]);
//! ```

pub mod component;
pub mod error;
pub mod factory;
pub mod message;
pub mod options;
pub(crate) mod order;
pub mod parameter;
pub mod system;

pub use component::{Component, ComponentCore, CqsType, LifecycleState, SimContext};
pub use error::{ErrorClass, SimError, SimResult};
pub use factory::{
    ComponentFactory, SUBSYSTEM_TYPE, create_component, register_subsystem,
};
pub use message::{Message, MessageHandler, MessageLevel};
pub use options::SimOptions;
pub use parameter::{Parameter, ParameterSet, ParameterValue};
pub use system::{ComponentSystem, Endpoint, NodeSnapshot, RunOutcome};
