use std::collections::BTreeSet;

use crate::agent::{Agent, AgentId};
use crate::error::{Result, SwarmError};
use crate::population::Population;

/// Merges resonant, energetic agents pairwise into deeper composites.
#[derive(Clone, Copy, Debug)]
pub struct CompositionEngine {
    composition_efficiency: f64,
    energy_cap: f64,
}

impl CompositionEngine {
    /// `composition_efficiency` must lie strictly inside (0, 1): a composite
    /// always carries less energy than its parents did together. Composite
    /// energy is further capped at `energy_cap`.
    pub fn new(composition_efficiency: f64, energy_cap: f64) -> Result<Self> {
        if !(composition_efficiency > 0.0 && composition_efficiency < 1.0) {
            return Err(SwarmError::invalid(
                "composition_efficiency",
                format!("must be in (0, 1), got {composition_efficiency}"),
            ));
        }
        if !(energy_cap.is_finite() && energy_cap > 0.0) {
            return Err(SwarmError::invalid(
                "energy_cap",
                format!("must be > 0, got {energy_cap}"),
            ));
        }
        Ok(Self {
            composition_efficiency,
            energy_cap,
        })
    }

    /// Whether `agent` may take part in a composition pass.
    pub fn is_eligible(
        agent: &Agent,
        resonance_threshold: f64,
        energy_threshold: f64,
        max_depth: u32,
    ) -> bool {
        agent.alive
            && agent.resonance >= resonance_threshold
            && agent.energy >= energy_threshold
            && agent.depth < max_depth
    }

    /// One composition pass. Returns the number of composites created.
    ///
    /// Eligible agents are stably sorted by energy ascending (ties keep
    /// population order) and paired off consecutively; an odd one out waits
    /// for a later cycle. Parents are marked dead but stay in the population
    /// until the orchestrator sweeps it.
    pub fn attempt_composition(
        &self,
        population: &mut Population,
        resonance_threshold: f64,
        energy_threshold: f64,
        max_depth: u32,
    ) -> Result<usize> {
        let mut eligible: Vec<(AgentId, f64)> = population
            .alive()
            .filter(|a| Self::is_eligible(a, resonance_threshold, energy_threshold, max_depth))
            .map(|a| (a.id, a.energy))
            .collect();
        eligible.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut events = 0;
        for pair in eligible.chunks_exact(2) {
            let (first_id, second_id) = (pair[0].0, pair[1].0);
            let composite = {
                let first = population.require(first_id)?;
                let second = population.require(second_id)?;
                let energy = (first.energy + second.energy) * self.composition_efficiency;
                let mut composite = Agent::with_state(
                    AgentId(0),
                    first.depth.max(second.depth) + 1,
                    energy.min(self.energy_cap),
                    first.state.blend(second.state),
                    first.anchor.clone(),
                );
                composite.resonance = (first.resonance + second.resonance) / 2.0;
                composite.children_ids = BTreeSet::from([first_id, second_id]);
                composite
            };
            let depth = composite.depth;
            let energy = composite.energy;
            let composite_id = population.insert(composite);

            for parent_id in [first_id, second_id] {
                let parent = population.require_mut(parent_id)?;
                parent.kill();
                parent.parent_id = Some(composite_id);
            }

            tracing::debug!(
                "composed {first_id} + {second_id} -> {composite_id} (depth {depth}, energy {energy:.3})"
            );
            events += 1;
        }

        Ok(events)
    }
}
