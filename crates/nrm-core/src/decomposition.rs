use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId};
use crate::constants::SPLIT_ANGLE;
use crate::error::{Result, SwarmError};
use crate::population::Population;

/// Which side of the energy threshold triggers a split. Fixed per run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecompositionThreshold {
    /// Composites holding more than this much energy burst apart.
    Above(f64),
    /// Composites starved below this much energy fall apart.
    Below(f64),
}

impl DecompositionThreshold {
    pub fn value(&self) -> f64 {
        match self {
            Self::Above(x) | Self::Below(x) => *x,
        }
    }

    pub fn is_crossed(&self, energy: f64) -> bool {
        match self {
            Self::Above(x) => energy > *x,
            Self::Below(x) => energy < *x,
        }
    }
}

impl Default for DecompositionThreshold {
    fn default() -> Self {
        Self::Above(80.0)
    }
}

/// Splits composites back into two shallower children.
#[derive(Clone, Copy, Debug)]
pub struct DecompositionEngine {
    decomposition_share: f64,
}

impl DecompositionEngine {
    /// Each child receives `decomposition_share` of the parent's energy, so
    /// the share must lie in (0, 0.5) for the split to lose energy.
    pub fn new(decomposition_share: f64) -> Result<Self> {
        if !(decomposition_share > 0.0 && decomposition_share < 0.5) {
            return Err(SwarmError::invalid(
                "decomposition_share",
                format!("must be in (0, 0.5), got {decomposition_share}"),
            ));
        }
        Ok(Self {
            decomposition_share,
        })
    }

    /// One decomposition pass. Returns the number of composites split.
    ///
    /// Agents created earlier in the same cycle (see
    /// `Population::mark_cycle_start`) are never split.
    pub fn attempt_decomposition(
        &self,
        population: &mut Population,
        decomposition_threshold: DecompositionThreshold,
    ) -> Result<usize> {
        let eligible: Vec<AgentId> = population
            .alive()
            .filter(|a| {
                a.is_composite()
                    && decomposition_threshold.is_crossed(a.energy)
                    && !population.is_newborn(a.id)
            })
            .map(|a| a.id)
            .collect();

        for &composite_id in &eligible {
            let (left, right) = {
                let composite = population.require(composite_id)?;
                let energy = composite.energy * self.decomposition_share;
                let child = |angle: f64| {
                    let mut child = Agent::with_state(
                        AgentId(0),
                        composite.depth - 1,
                        energy,
                        composite.state.rotated(angle),
                        composite.anchor.clone(),
                    );
                    child.resonance = composite.resonance;
                    child.parent_id = Some(composite_id);
                    child
                };
                (child(SPLIT_ANGLE), child(-SPLIT_ANGLE))
            };
            let left_id = population.insert(left);
            let right_id = population.insert(right);

            let composite = population.require_mut(composite_id)?;
            composite.kill();
            composite.children_ids.insert(left_id);
            composite.children_ids.insert(right_id);

            tracing::debug!(
                "decomposed {composite_id} (depth {}) -> {left_id} + {right_id}",
                composite.depth
            );
        }

        Ok(eligible.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{PhaseMapper, TranscendentalState};
    use crate::snapshot::RealitySnapshot;

    fn agent(depth: u32, energy: f64) -> Agent {
        Agent::with_state(
            AgentId(0),
            depth,
            energy,
            TranscendentalState::new(1.0, 2.0, 3.0, 1.0),
            RealitySnapshot::at(10.0, 10.0, 10.0, 1, 0.0),
        )
    }

    fn engine() -> DecompositionEngine {
        DecompositionEngine::new(0.45).unwrap()
    }

    #[test]
    fn test_share_validation() {
        assert!(DecompositionEngine::new(0.0).is_err());
        assert!(DecompositionEngine::new(0.5).is_err());
        assert!(DecompositionEngine::new(-0.1).is_err());
        assert!(DecompositionEngine::new(0.49).is_ok());
    }

    #[test]
    fn test_threshold_direction() {
        assert!(DecompositionThreshold::Above(10.0).is_crossed(10.5));
        assert!(!DecompositionThreshold::Above(10.0).is_crossed(10.0));
        assert!(DecompositionThreshold::Below(10.0).is_crossed(9.5));
        assert!(!DecompositionThreshold::Below(10.0).is_crossed(10.0));
        assert_eq!(DecompositionThreshold::Below(3.0).value(), 3.0);
    }

    #[test]
    fn test_split_produces_two_shallower_children() {
        let mut pop = Population::new();
        let composite_id = pop.insert(agent(3, 100.0));
        pop.mark_cycle_start();

        let events = engine()
            .attempt_decomposition(&mut pop, DecompositionThreshold::Above(50.0))
            .unwrap();
        assert_eq!(events, 1);

        let composite = pop.get(composite_id).unwrap();
        assert!(!composite.alive);
        assert_eq!(composite.children_ids.len(), 2);

        let children: Vec<&Agent> = pop.alive().collect();
        assert_eq!(children.len(), 2);
        let total: f64 = children.iter().map(|c| c.energy).sum();
        assert!(total < 100.0);
        for child in &children {
            assert_eq!(child.depth, 2);
            assert!((child.energy - 45.0).abs() < 1e-12);
            assert_eq!(child.parent_id, Some(composite_id));
            assert!(composite.children_ids.contains(&child.id));
        }
    }

    #[test]
    fn test_children_states_differ() {
        let mut pop = Population::new();
        pop.insert(agent(2, 100.0));
        pop.mark_cycle_start();
        engine()
            .attempt_decomposition(&mut pop, DecompositionThreshold::Above(50.0))
            .unwrap();

        let mapper = PhaseMapper::default();
        let children: Vec<&Agent> = pop.alive().collect();
        let sim = children[0].resonance_with(children[1], &mapper).similarity;
        assert!(sim < 1.0);
        assert!(sim > 0.0);
    }

    #[test]
    fn test_atomic_agents_never_split() {
        let mut pop = Population::new();
        pop.insert(agent(1, 1000.0));
        pop.mark_cycle_start();
        let events = engine()
            .attempt_decomposition(&mut pop, DecompositionThreshold::Above(50.0))
            .unwrap();
        assert_eq!(events, 0);
        assert_eq!(pop.alive_count(), 1);
    }

    #[test]
    fn test_below_threshold_mode() {
        let mut pop = Population::new();
        let starving = pop.insert(agent(2, 4.0));
        let healthy = pop.insert(agent(2, 40.0));
        pop.mark_cycle_start();

        let events = engine()
            .attempt_decomposition(&mut pop, DecompositionThreshold::Below(5.0))
            .unwrap();
        assert_eq!(events, 1);
        assert!(!pop.get(starving).unwrap().alive);
        assert!(pop.get(healthy).unwrap().alive);
    }

    #[test]
    fn test_newborn_composite_not_split() {
        let mut pop = Population::new();
        pop.mark_cycle_start();
        let fresh = pop.insert(agent(2, 100.0));
        let events = engine()
            .attempt_decomposition(&mut pop, DecompositionThreshold::Above(50.0))
            .unwrap();
        assert_eq!(events, 0);
        assert!(pop.get(fresh).unwrap().alive);
    }

    #[test]
    fn test_serde_externally_tagged() {
        let json = serde_json::to_string(&DecompositionThreshold::Below(2.5)).unwrap();
        assert_eq!(json, r#"{"below":2.5}"#);
    }
}
