//! Component type registry.

use crate::component::Component;
use crate::error::{SimError, SimResult};
use crate::system::ComponentSystem;
use tlm_core::ClassFactory;

/// Maps type names such as `"HydraulicVolumeC"` to component creators.
pub type ComponentFactory = ClassFactory<String, Box<dyn Component>>;

/// Type name under which [`register_subsystem`] registers [`ComponentSystem`].
pub const SUBSYSTEM_TYPE: &str = "Subsystem";

/// Create a component by type name.
pub fn create_component(
    factory: &mut ComponentFactory,
    type_name: &str,
) -> SimResult<Box<dyn Component>> {
    factory
        .create_instance(&type_name.to_string())
        .ok_or_else(|| SimError::UnknownType {
            type_name: type_name.to_string(),
        })
}

pub fn register_subsystem(factory: &mut ComponentFactory) {
    factory.register_creator(SUBSYSTEM_TYPE.to_string(), || {
        Box::new(ComponentSystem::new(SUBSYSTEM_TYPE))
    });
}
