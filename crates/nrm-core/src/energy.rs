use crate::agent::Agent;
use crate::error::{Result, SwarmError};
use crate::snapshot::RealitySnapshot;

/// Couples agent vitality to host load: idle capacity recharges agents,
/// metabolism drains them, exhaustion kills them.
#[derive(Clone, Copy, Debug)]
pub struct EnergyRegulator {
    energy_cap: f64,
    metabolic_decay: f64,
}

impl EnergyRegulator {
    pub fn new(energy_cap: f64, metabolic_decay: f64) -> Result<Self> {
        if !(energy_cap.is_finite() && energy_cap > 0.0) {
            return Err(SwarmError::invalid(
                "energy_cap",
                format!("must be > 0, got {energy_cap}"),
            ));
        }
        if !(metabolic_decay.is_finite() && metabolic_decay >= 0.0) {
            return Err(SwarmError::invalid(
                "metabolic_decay",
                format!("must be >= 0, got {metabolic_decay}"),
            ));
        }
        Ok(Self {
            energy_cap,
            metabolic_decay,
        })
    }

    /// Energy gained this cycle before decay: `recharge_rate × idle fraction`.
    pub fn gain(reality: &RealitySnapshot, recharge_rate: f64) -> f64 {
        recharge_rate * reality.idle_fraction()
    }

    /// Apply one cycle of recharge and decay. Returns the new energy.
    pub fn update_energy(
        &self,
        agent: &mut Agent,
        reality: &RealitySnapshot,
        recharge_rate: f64,
    ) -> f64 {
        let next = agent.energy + Self::gain(reality, recharge_rate) - self.metabolic_decay;
        agent.energy = next.clamp(0.0, self.energy_cap);
        if agent.energy <= 0.0 {
            agent.kill();
        }
        agent.energy
    }
}
