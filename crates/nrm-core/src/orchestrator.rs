//! The swarm cycle.
//!
//! Each cycle runs a fixed pipeline against one reality snapshot:
//!
//! 1. capture a snapshot
//! 2. re-ground every living agent
//! 3. cluster by resonance, score agents
//! 4. compose
//! 5. decompose
//! 6. spawn
//! 7. recharge/decay agents that existed before step 4
//! 8. sweep the dead
//! 9. summarize
//!
//! Steps 2-9 run against a staged copy of the population and RNG which is
//! committed only when the whole cycle succeeds. A failed cycle leaves the
//! orchestrator exactly as it was.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{Agent, AgentId};
use crate::cluster::{ResonanceClusterer, ResonantCluster};
use crate::composition::CompositionEngine;
use crate::config::SwarmConfig;
use crate::decomposition::DecompositionEngine;
use crate::energy::EnergyRegulator;
use crate::error::Result;
use crate::gateway::RealityGateway;
use crate::phase::PhaseMapper;
use crate::population::Population;
use crate::snapshot::RealitySnapshot;

/// Per-cycle output record. Field names are a stable contract for loggers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub population: usize,
    pub mean_energy: f64,
    pub mean_resonance: f64,
    pub composition_events: usize,
    pub decomposition_events: usize,
    pub system_cpu: f64,
    pub system_memory: f64,
}

/// Result of one staged cycle, before it is committed.
struct CycleOutcome {
    summary: CycleSummary,
    clusters: Vec<ResonantCluster>,
}

/// Owns the population and drives it through resonance cycles.
pub struct SwarmOrchestrator<G> {
    config: SwarmConfig,
    mapper: PhaseMapper,
    composer: CompositionEngine,
    decomposer: DecompositionEngine,
    regulator: EnergyRegulator,
    gateway: G,
    population: Population,
    rng: SmallRng,
    cycle: u64,
    clusters: Vec<ResonantCluster>,
    last_summary: Option<CycleSummary>,
    run_id: Uuid,
}

impl<G: RealityGateway> SwarmOrchestrator<G> {
    /// Validate `config` and build an empty swarm sampling from `gateway`.
    pub fn new(config: SwarmConfig, gateway: G) -> Result<Self> {
        config.validate()?;
        let mapper = PhaseMapper::new(config.resonance_threshold)?;
        let composer = CompositionEngine::new(config.composition_efficiency, config.energy_cap)?;
        let decomposer = DecompositionEngine::new(config.decomposition_share)?;
        let regulator = EnergyRegulator::new(config.energy_cap, config.metabolic_decay)?;
        let rng = SmallRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            mapper,
            composer,
            decomposer,
            regulator,
            gateway,
            population: Population::new(),
            rng,
            cycle: 0,
            clusters: Vec::new(),
            last_summary: None,
            run_id: Uuid::new_v4(),
        })
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Number of committed cycles.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn last_summary(&self) -> Option<&CycleSummary> {
        self.last_summary.as_ref()
    }

    /// Clusters computed by the last committed cycle.
    pub fn clusters(&self) -> &[ResonantCluster] {
        &self.clusters
    }

    pub fn population_len(&self) -> usize {
        self.population.len()
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.population.iter()
    }

    pub fn agent(&self, id: AgentId) -> Result<&Agent> {
        self.population.require(id)
    }

    /// Insert one depth-1 agent grounded in `snapshot`.
    pub fn spawn(&mut self, snapshot: &RealitySnapshot, energy: f64) -> AgentId {
        let agent = Agent::from_snapshot(snapshot, &self.mapper, None, energy);
        self.population.insert(agent)
    }

    /// Capture one snapshot and spawn `initial_population` agents from it.
    pub fn seed_population(&mut self) -> Result<Vec<AgentId>> {
        let snapshot = self.gateway.capture_snapshot()?;
        let energy = self.config.initial_energy;
        let ids: Vec<AgentId> = (0..self.config.initial_population)
            .map(|_| self.spawn(&snapshot, energy))
            .collect();
        tracing::info!(
            "run {}: seeded {} agents at cpu={:.1}% mem={:.1}%",
            self.run_id,
            ids.len(),
            snapshot.cpu_percent,
            snapshot.memory_percent
        );
        Ok(ids)
    }

    /// Run one cycle against a freshly captured snapshot.
    pub fn step(&mut self) -> Result<CycleSummary> {
        let snapshot = match self.gateway.capture_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("run {}: cycle {} aborted: {e}", self.run_id, self.cycle + 1);
                return Err(e);
            }
        };
        self.step_with(snapshot)
    }

    /// Run one cycle against an externally supplied snapshot.
    pub fn step_with(&mut self, snapshot: RealitySnapshot) -> Result<CycleSummary> {
        let mut population = self.population.clone();
        let mut rng = self.rng.clone();
        let cycle = self.cycle + 1;

        let outcome = match self.advance(&mut population, &mut rng, &snapshot, cycle) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("run {}: cycle {cycle} aborted: {e}", self.run_id);
                return Err(e);
            }
        };

        self.population = population;
        self.rng = rng;
        self.cycle = cycle;
        self.clusters = outcome.clusters;
        self.last_summary = Some(outcome.summary.clone());
        Ok(outcome.summary)
    }

    /// Run `cycles` cycles, stopping at the first failure.
    pub fn run(&mut self, cycles: u64) -> Result<Vec<CycleSummary>> {
        let mut summaries = Vec::new();
        for _ in 0..cycles {
            summaries.push(self.step()?);
        }
        Ok(summaries)
    }

    /// Run up to `cycles` cycles, handing each summary to `on_cycle`.
    /// `cancel` is checked only between cycles. Returns cycles completed.
    pub fn run_until<F>(&mut self, cycles: u64, cancel: &AtomicBool, mut on_cycle: F) -> Result<u64>
    where
        F: FnMut(&CycleSummary),
    {
        let mut completed = 0;
        while completed < cycles {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!("run {}: cancelled after {completed} cycles", self.run_id);
                break;
            }
            let summary = self.step()?;
            on_cycle(&summary);
            completed += 1;
        }
        Ok(completed)
    }

    fn advance(
        &self,
        population: &mut Population,
        rng: &mut SmallRng,
        snapshot: &RealitySnapshot,
        cycle: u64,
    ) -> Result<CycleOutcome> {
        let config = &self.config;
        population.mark_cycle_start();

        for agent in population.iter_mut().filter(|a| a.alive) {
            agent.update(snapshot, &self.mapper);
        }

        let clusters = {
            let alive: Vec<&Agent> = population.alive().collect();
            ResonanceClusterer::find_resonant_clusters(&alive, &self.mapper, None)
        };
        let mut scores: HashMap<AgentId, f64> = clusters.iter().flat_map(|c| c.scores()).collect();
        for agent in population.iter_mut().filter(|a| a.alive) {
            agent.resonance = scores.remove(&agent.id).unwrap_or(0.0);
        }

        let established = population.alive_ids();

        let composition_events = self.composer.attempt_composition(
            population,
            config.resonance_threshold,
            config.energy_threshold,
            config.max_composition_depth,
        )?;
        let decomposition_events = self
            .decomposer
            .attempt_decomposition(population, config.decomposition_threshold)?;

        // Always draw, so the RNG stream does not depend on spawn_frequency being zero.
        if rng.random_bool(config.spawn_frequency) {
            for _ in 0..config.spawn_batch {
                let agent =
                    Agent::from_snapshot(snapshot, &self.mapper, None, config.initial_energy);
                population.insert(agent);
            }
        }

        for id in established {
            let agent = population.require_mut(id)?;
            if agent.alive {
                self.regulator.update_energy(agent, snapshot, config.recharge_rate);
            }
        }

        for agent in population.iter_mut() {
            if agent.alive && agent.energy <= 0.0 {
                agent.kill();
            }
        }
        let removed = population.remove_dead();

        let count = population.len();
        let (mean_energy, mean_resonance) = if count == 0 {
            (0.0, 0.0)
        } else {
            let energy: f64 = population.iter().map(|a| a.energy).sum();
            let resonance: f64 = population.iter().map(|a| a.resonance).sum();
            (energy / count as f64, resonance / count as f64)
        };

        tracing::debug!(
            "run {}: cycle {cycle} population={count} removed={removed} clusters={} composed={composition_events} decomposed={decomposition_events} energy={:.3}",
            self.run_id,
            clusters.len(),
            population.total_energy()
        );

        Ok(CycleOutcome {
            summary: CycleSummary {
                cycle,
                population: count,
                mean_energy,
                mean_resonance,
                composition_events,
                decomposition_events,
                system_cpu: snapshot.cpu_percent,
                system_memory: snapshot.memory_percent,
            },
            clusters,
        })
    }
}
