//! tlm-components: default component library for TLM models.
//!
//! Provides:
//! - Signal sources, arithmetic, a first order filter, an integrator and a
//!   PID controller
//! - Hydraulic pressure/flow sources, a volume, laminar and turbulent
//!   orifices and a variable displacement motor
//! - A rotational torsional spring
//!
//! C components compute wave variables and impedances, Q components compute
//! flows and pressures from them. [`register_default_library`] makes all of
//! them available by type name.
//!
//! # Example
//!
//! ```no_run
//! use tlm_components::register_default_library;
//! use tlm_sim::{ComponentFactory, ComponentSystem};
//!
//! let mut factory = ComponentFactory::new();
//! register_default_library(&mut factory);
//!
//! let mut root = ComponentSystem::new("Root");
//! root.set_timestep(1e-3).unwrap();
//! root.add_new(&mut factory, "HydraulicPressureSourceC", "Pump").unwrap();
//! root.add_new(&mut factory, "HydraulicLaminarOrificeQ", "Orifice").unwrap();
//! root.add_new(&mut factory, "HydraulicPressureSourceC", "Tank").unwrap();
//! root.set_parameter("Pump", "p", 10e5).unwrap();
//! root.connect(("Pump", "P1"), ("Orifice", "P1")).unwrap();
//! root.connect(("Orifice", "P2"), ("Tank", "P1")).unwrap();
//!
//! root.initialize(0.0, 0.1).unwrap();
//! root.simulate(0.1).unwrap();
//! root.finalize().unwrap();
//! println!("{:?}", root.port_value(("Orifice", "P2"), "Flow"));
//! ```

pub mod common;
pub mod hydraulic;
pub mod mechanic;
pub mod signal;

pub use hydraulic::{
    HydraulicFlowSourceQ, HydraulicLaminarOrificeQ, HydraulicPressureSourceC,
    HydraulicTurbulentOrificeQ, HydraulicVariableDisplacementMotorQ, HydraulicVolumeC,
};
pub use mechanic::MechanicTorsionalSpringC;
pub use signal::{
    SignalConstant, SignalFirstOrderFilter, SignalGain, SignalIntegrator, SignalPid, SignalSink,
    SignalStep, SignalSum,
};

use tlm_sim::{Component, ComponentFactory, register_subsystem};

fn boxed<C: Component + Default + 'static>() -> Box<dyn Component> {
    Box::new(C::default())
}

/// Register every component of this crate plus the subsystem type.
///
/// Registering a name twice keeps the first creator; the factory's
/// register status records the clash.
pub fn register_default_library(factory: &mut ComponentFactory) {
    let creators: [(&str, fn() -> Box<dyn Component>); 15] = [
        (SignalConstant::TYPE_NAME, boxed::<SignalConstant>),
        (SignalStep::TYPE_NAME, boxed::<SignalStep>),
        (SignalSink::TYPE_NAME, boxed::<SignalSink>),
        (SignalGain::TYPE_NAME, boxed::<SignalGain>),
        (SignalSum::TYPE_NAME, boxed::<SignalSum>),
        (SignalFirstOrderFilter::TYPE_NAME, boxed::<SignalFirstOrderFilter>),
        (SignalIntegrator::TYPE_NAME, boxed::<SignalIntegrator>),
        (SignalPid::TYPE_NAME, boxed::<SignalPid>),
        (HydraulicPressureSourceC::TYPE_NAME, boxed::<HydraulicPressureSourceC>),
        (HydraulicFlowSourceQ::TYPE_NAME, boxed::<HydraulicFlowSourceQ>),
        (HydraulicVolumeC::TYPE_NAME, boxed::<HydraulicVolumeC>),
        (HydraulicLaminarOrificeQ::TYPE_NAME, boxed::<HydraulicLaminarOrificeQ>),
        (HydraulicTurbulentOrificeQ::TYPE_NAME, boxed::<HydraulicTurbulentOrificeQ>),
        (
            HydraulicVariableDisplacementMotorQ::TYPE_NAME,
            boxed::<HydraulicVariableDisplacementMotorQ>,
        ),
        (MechanicTorsionalSpringC::TYPE_NAME, boxed::<MechanicTorsionalSpringC>),
    ];
    for (name, creator) in creators {
        factory.register_creator(name.to_string(), creator);
    }
    register_subsystem(factory);
    tracing::debug!(
        count = creators.len() + 1,
        "registered default component library"
    );
}
