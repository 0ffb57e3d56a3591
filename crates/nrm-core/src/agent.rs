use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::phase::{PhaseMapper, ResonanceMatch, TranscendentalState};
use crate::snapshot::RealitySnapshot;

/// Stable population handle. Allocated monotonically, never reused, so a
/// stale id simply fails to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A phase-space agent anchored to the snapshot it was last updated from.
///
/// `parent_id` and `children_ids` are lookup-only links through the
/// composition hierarchy: the deeper agent is always the parent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub depth: u32,
    pub energy: f64,
    pub state: TranscendentalState,
    pub anchor: RealitySnapshot,
    resonance_history: Vec<f64>,
    /// Cluster-derived score from the most recent clustering pass.
    pub resonance: f64,
    pub alive: bool,
    pub parent_id: Option<AgentId>,
    pub children_ids: BTreeSet<AgentId>,
}

impl Agent {
    /// Depth-1 agent whose state is the phase mapping of `snapshot`.
    pub fn from_snapshot(
        snapshot: &RealitySnapshot,
        mapper: &PhaseMapper,
        id: Option<AgentId>,
        energy: f64,
    ) -> Self {
        let state = mapper.reality_to_phase(&snapshot.metrics());
        Self::with_state(
            id.unwrap_or(AgentId(0)),
            1,
            energy,
            state,
            snapshot.clone(),
        )
    }

    pub(crate) fn with_state(
        id: AgentId,
        depth: u32,
        energy: f64,
        state: TranscendentalState,
        anchor: RealitySnapshot,
    ) -> Self {
        Self {
            id,
            depth,
            energy: energy.max(0.0),
            state,
            anchor,
            resonance_history: Vec::new(),
            resonance: 0.0,
            alive: true,
            parent_id: None,
            children_ids: BTreeSet::new(),
        }
    }

    /// Re-ground the agent: recompute its state from `snapshot`, record how
    /// strongly the new state resonates with the old one, move the anchor.
    pub fn update(&mut self, snapshot: &RealitySnapshot, mapper: &PhaseMapper) {
        let next = mapper.reality_to_phase(&snapshot.metrics());
        let continuity = mapper.detect_resonance(&self.state, &next);
        self.resonance_history.push(continuity.similarity);
        self.state = next;
        self.anchor = snapshot.clone();
    }

    pub fn resonance_with(&self, other: &Agent, mapper: &PhaseMapper) -> ResonanceMatch {
        mapper.detect_resonance(&self.state, &other.state)
    }

    /// Append-only; exposed read-only so callers cannot truncate it.
    pub fn resonance_history(&self) -> &[f64] {
        &self.resonance_history
    }

    pub fn last_resonance(&self) -> Option<f64> {
        self.resonance_history.last().copied()
    }

    pub fn is_composite(&self) -> bool {
        self.depth > 1
    }

    pub(crate) fn kill(&mut self) {
        self.alive = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(cpu: f64, mem: f64) -> RealitySnapshot {
        RealitySnapshot::at(cpu, mem, 40.0, 120, 0.0)
    }

    #[test]
    fn test_from_snapshot_defaults() {
        let mapper = PhaseMapper::default();
        let s = snap(20.0, 30.0);
        let agent = Agent::from_snapshot(&s, &mapper, Some(AgentId(3)), 25.0);
        assert_eq!(agent.id, AgentId(3));
        assert_eq!(agent.depth, 1);
        assert_eq!(agent.energy, 25.0);
        assert!(agent.alive);
        assert!(agent.resonance_history().is_empty());
        assert_eq!(agent.anchor, s);
        assert_eq!(agent.state, mapper.reality_to_phase(&s.metrics()));
        assert!(agent.parent_id.is_none());
    }

    #[test]
    fn test_negative_energy_floored() {
        let mapper = PhaseMapper::default();
        let agent = Agent::from_snapshot(&snap(0.0, 0.0), &mapper, None, -4.0);
        assert_eq!(agent.energy, 0.0);
    }

    #[test]
    fn test_update_appends_history_and_moves_anchor() {
        let mapper = PhaseMapper::default();
        let mut agent = Agent::from_snapshot(&snap(20.0, 30.0), &mapper, None, 10.0);

        agent.update(&snap(20.0, 30.0), &mapper);
        assert_eq!(agent.resonance_history().len(), 1);
        assert!((agent.last_resonance().unwrap() - 1.0).abs() < 1e-12);

        let moved = snap(85.0, 10.0);
        agent.update(&moved, &mapper);
        assert_eq!(agent.resonance_history().len(), 2);
        assert!(agent.last_resonance().unwrap() < 1.0);
        assert_eq!(agent.anchor, moved);
        assert_eq!(agent.state, mapper.reality_to_phase(&moved.metrics()));
    }

    #[test]
    fn test_history_never_shrinks() {
        let mapper = PhaseMapper::default();
        let mut agent = Agent::from_snapshot(&snap(1.0, 1.0), &mapper, None, 10.0);
        let mut last_len = 0;
        for i in 0..20 {
            agent.update(&snap(i as f64 * 5.0, 50.0), &mapper);
            assert!(agent.resonance_history().len() > last_len);
            last_len = agent.resonance_history().len();
        }
    }

    #[test]
    fn test_resonance_with_same_snapshot() {
        let mapper = PhaseMapper::default();
        let s = snap(44.0, 55.0);
        let a = Agent::from_snapshot(&s, &mapper, Some(AgentId(1)), 10.0);
        let b = Agent::from_snapshot(&s, &mapper, Some(AgentId(2)), 10.0);
        assert!((a.resonance_with(&b, &mapper).similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_display_id() {
        assert_eq!(AgentId(42).to_string(), "#42");
    }
}
