//! Torsional spring as a transmission line element.

use crate::common::{bound, check_finite, core_accessors};
use tlm_graph::{NodeType, SlotRef, mechanic_rotational as rot};
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimResult};

/// C-type spring between two shafts, `Zx = k * dt`.
///
/// ```text
/// c1 = c2 + 2 * Zx * w2
/// c2 = c1 + 2 * Zx * w1
/// ```
///
/// with the right hand sides taken from the previous step.
#[derive(Debug)]
pub struct MechanicTorsionalSpringC {
    core: ComponentCore,
    // per port: c, Zx, torque, angular velocity
    slots: Option<[[SlotRef; 4]; 2]>,
    zx: f64,
}

impl MechanicTorsionalSpringC {
    pub const TYPE_NAME: &'static str = "MechanicTorsionalSpringC";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::C),
            slots: None,
            zx: 0.0,
        }
    }
}

impl Default for MechanicTorsionalSpringC {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for MechanicTorsionalSpringC {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core
            .add_power_port("P1", NodeType::MechanicRotational)?;
        self.core
            .add_power_port("P2", NodeType::MechanicRotational)?;
        self.core.add_parameter(
            Parameter::real("k", 1000.0)
                .description("Spring constant")
                .unit("Nm/rad")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.zx = self.core.parameters().real("k")? * ctx.timestep;
        let port = |name: &str| -> SimResult<[SlotRef; 4]> {
            Ok([
                self.core.slot(name, rot::WAVE_VARIABLE)?,
                self.core.slot(name, rot::CHAR_IMPEDANCE)?,
                self.core.slot(name, rot::TORQUE)?,
                self.core.slot(name, rot::ANGULAR_VELOCITY)?,
            ])
        };
        let slots = [port("P1")?, port("P2")?];
        for [c, zx, t, w] in slots {
            let wave = ctx.read(t) - self.zx * ctx.read(w);
            ctx.write(c, wave);
            ctx.write(zx, self.zx);
        }
        self.slots = Some(slots);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let [[c1, z1, _, w1], [c2, z2, _, w2]] = bound(self.slots, &self.core)?;
        let zx = self.zx;
        let new_c1 = ctx.read(c2) + 2.0 * zx * ctx.read(w2);
        let new_c2 = ctx.read(c1) + 2.0 * zx * ctx.read(w1);
        let name = self.core.name();
        ctx.write(c1, check_finite(name, new_c1, "P1 wave variable")?);
        ctx.write(c2, check_finite(name, new_c2, "P2 wave variable")?);
        ctx.write(z1, zx);
        ctx.write(z2, zx);
        Ok(())
    }
}
