use std::collections::BTreeMap;

use crate::agent::{Agent, AgentId};
use crate::error::{Result, SwarmError};

/// Arena of agents keyed by monotonic id.
///
/// Ids grow with every insert and are never recycled, so iteration order is
/// insertion order and a removed id stays unresolvable forever.
#[derive(Clone, Debug, Default)]
pub struct Population {
    agents: BTreeMap<AgentId, Agent>,
    next_id: u64,
    cycle_floor: u64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an agent under a fresh id, overwriting whatever id it carried.
    pub fn insert(&mut self, mut agent: Agent) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        agent.id = id;
        self.agents.insert(id, agent);
        id
    }

    /// Start a new cycle: agents inserted from here on count as newborn.
    pub fn mark_cycle_start(&mut self) {
        self.cycle_floor = self.next_id;
    }

    /// Created since the last `mark_cycle_start`.
    pub fn is_newborn(&self, id: AgentId) -> bool {
        id.0 >= self.cycle_floor
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Lookup where absence is a contract violation rather than a normal outcome.
    pub fn require(&self, id: AgentId) -> Result<&Agent> {
        self.get(id).ok_or(SwarmError::AgentNotFound(id))
    }

    pub fn require_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        self.get_mut(id).ok_or(SwarmError::AgentNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// All agents, dead or alive, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    pub fn alive(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|a| a.alive)
    }

    pub fn alive_ids(&self) -> Vec<AgentId> {
        self.alive().map(|a| a.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    /// Drop every dead agent. Returns how many were removed.
    pub fn remove_dead(&mut self) -> usize {
        let before = self.agents.len();
        self.agents.retain(|_, a| a.alive);
        before - self.agents.len()
    }

    /// Total energy of living agents.
    pub fn total_energy(&self) -> f64 {
        self.alive().map(|a| a.energy).sum()
    }
}
