//! Lumped fluid volume as a transmission line element.

use crate::common::{bound, check_finite, core_accessors};
use tlm_graph::{NodeType, SlotRef, hydraulic};
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimResult};

/// C-type volume between P1 and P2.
///
/// `Zc = Beta_e / V * dt / (1 - alpha)`. Each step the wave arriving at one
/// port is the reflection of the other port's state one timestep earlier,
/// low-pass filtered by `alpha`:
///
/// ```text
/// c1 = alpha * c1 + (1 - alpha) * (p2 + Zc * q2)
/// c2 = alpha * c2 + (1 - alpha) * (p1 + Zc * q1)
/// ```
#[derive(Debug)]
pub struct HydraulicVolumeC {
    core: ComponentCore,
    // per port: c, Zc, p, q
    slots: Option<[[SlotRef; 4]; 2]>,
    zc: f64,
    alpha: f64,
}

impl HydraulicVolumeC {
    pub const TYPE_NAME: &'static str = "HydraulicVolumeC";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::C),
            slots: None,
            zc: 0.0,
            alpha: 0.1,
        }
    }

    pub fn impedance(&self) -> f64 {
        self.zc
    }
}

impl Default for HydraulicVolumeC {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HydraulicVolumeC {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_power_port("P1", NodeType::Hydraulic)?;
        self.core.add_power_port("P2", NodeType::Hydraulic)?;
        self.core.add_parameter(
            Parameter::real("V", 1e-3)
                .description("Volume")
                .unit("m^3")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("Beta_e", 1e9)
                .description("Bulk modulus")
                .unit("Pa")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("alpha", 0.1)
                .description("Low pass coefficient to dampen standing waves")
                .range(0.0, 0.99),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let p = self.core.parameters();
        let volume = p.real("V")?;
        let beta = p.real("Beta_e")?;
        self.alpha = p.real("alpha")?;
        self.zc = check_finite(
            self.core.name(),
            beta / volume * ctx.timestep / (1.0 - self.alpha),
            "characteristic impedance",
        )?;

        let port = |name: &str| -> SimResult<[SlotRef; 4]> {
            Ok([
                self.core.slot(name, hydraulic::WAVE_VARIABLE)?,
                self.core.slot(name, hydraulic::CHAR_IMPEDANCE)?,
                self.core.slot(name, hydraulic::PRESSURE)?,
                self.core.slot(name, hydraulic::FLOW)?,
            ])
        };
        let slots = [port("P1")?, port("P2")?];
        // Start each line at rest: c = p - Zc * q for its own port.
        for [c, zc, p, q] in slots {
            let wave = ctx.read(p) - self.zc * ctx.read(q);
            ctx.write(c, wave);
            ctx.write(zc, self.zc);
        }
        self.slots = Some(slots);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let [[c1, z1, p1, q1], [c2, z2, p2, q2]] = bound(self.slots, &self.core)?;
        let zc = self.zc;
        let a = self.alpha;
        let c10 = ctx.read(p2) + zc * ctx.read(q2);
        let c20 = ctx.read(p1) + zc * ctx.read(q1);
        let new_c1 = a * ctx.read(c1) + (1.0 - a) * c10;
        let new_c2 = a * ctx.read(c2) + (1.0 - a) * c20;
        let name = self.core.name();
        ctx.write(c1, check_finite(name, new_c1, "P1 wave variable")?);
        ctx.write(c2, check_finite(name, new_c2, "P2 wave variable")?);
        ctx.write(z1, zc);
        ctx.write(z2, zc);
        Ok(())
    }
}
