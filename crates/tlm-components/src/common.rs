//! Helpers shared by the component implementations.

use tlm_core::numeric::ensure_finite;
use tlm_graph::{SlotRef, signal};
use tlm_sim::{ComponentCore, SimContext, SimError, SimResult};

/// Ensure a computed value is finite, reporting it against `component`.
pub fn check_finite(component: &str, value: f64, what: &'static str) -> SimResult<f64> {
    ensure_finite(value, what)
        .map_err(|_| SimError::numerical(component, format!("{what} is not finite ({value})")))
}

/// Slots resolved in `initialize`; stepping without them is a lifecycle error.
pub fn bound<T: Copy>(slots: Option<T>, core: &ComponentCore) -> SimResult<T> {
    slots.ok_or_else(|| SimError::Lifecycle {
        component: core.name().to_string(),
        what: "simulated before initialize".to_string(),
    })
}

/// Whether `port` is attached to a real node rather than a placeholder
/// for an unconnected optional port.
pub fn is_wired(core: &ComponentCore, ctx: &SimContext<'_>, port: &str) -> bool {
    core.port(port)
        .and_then(|p| p.node())
        .and_then(|id| ctx.nodes.node(id).ok())
        .is_some_and(|node| !node.attached().is_empty())
}

/// A signal input that falls back to a parameter while unconnected.
#[derive(Debug, Clone, Copy)]
pub struct ParamInput {
    slot: SlotRef,
    fallback: Option<f64>,
}

impl ParamInput {
    pub fn resolve(
        core: &ComponentCore,
        ctx: &SimContext<'_>,
        port: &str,
        parameter: &str,
    ) -> SimResult<Self> {
        let slot = core.slot(port, signal::VALUE)?;
        let fallback = if is_wired(core, ctx, port) {
            None
        } else {
            Some(core.parameters().real(parameter)?)
        };
        Ok(Self { slot, fallback })
    }

    pub fn read(&self, ctx: &SimContext<'_>) -> f64 {
        self.fallback.unwrap_or_else(|| ctx.read(self.slot))
    }
}

/// `core()`/`core_mut()` for components storing their core in `self.core`.
macro_rules! core_accessors {
    () => {
        fn core(&self) -> &tlm_sim::ComponentCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut tlm_sim::ComponentCore {
            &mut self.core
        }
    };
}

pub(crate) use core_accessors;
