//! Nested Resonance Memory swarm engine.
//!
//! Agents map sampled host metrics into a phase space built on the
//! transcendental constants π, e and φ, cluster by resonance, compose into
//! deeper composites and decompose back into shallower children, with energy
//! recharged by idle host capacity and drained by metabolism.
//!
//! Deterministic given a deterministic `RealityGateway` and a fixed seed.
//! Host sampling lives in `nrm-host`; this crate does no I/O beyond loading
//! a config file on request.

pub mod agent;
pub mod cluster;
pub mod composition;
pub mod config;
pub mod constants;
pub mod decomposition;
pub mod energy;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod phase;
pub mod population;
pub mod snapshot;

pub use agent::{Agent, AgentId};
pub use cluster::{PairMatch, ResonanceClusterer, ResonantCluster};
pub use composition::CompositionEngine;
pub use config::SwarmConfig;
pub use constants::{EPSILON, EULER, GOLDEN_ANGLE, PHI, SPLIT_ANGLE};
pub use decomposition::{DecompositionEngine, DecompositionThreshold};
pub use energy::EnergyRegulator;
pub use error::{Result, SwarmError};
pub use gateway::{FixedGateway, FnGateway, RealityGateway, ScriptedGateway};
pub use orchestrator::{CycleSummary, SwarmOrchestrator};
pub use phase::{PhaseMapper, ResonanceMatch, TranscendentalState};
pub use population::Population;
pub use snapshot::RealitySnapshot;
