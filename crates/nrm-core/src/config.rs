//! Swarm configuration.
//!
//! Every field has a default, so a `config.toml` only needs the values an
//! experiment actually varies:
//!
//! ```toml
//! resonance_threshold = 0.9
//! spawn_frequency = 0.25
//! seed = 7
//! decomposition_threshold = { below = 5.0 }
//! ```
//!
//! Values are checked by [`SwarmConfig::validate`]; out-of-domain values are
//! rejected with `InvalidConfiguration` before any orchestrator exists.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decomposition::DecompositionThreshold;
use crate::error::{Result, SwarmError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Minimum resonance for clustering and composition, in (0, 1).
    pub resonance_threshold: f64,
    /// Minimum energy an agent needs to compose.
    pub energy_threshold: f64,
    /// Fraction of the parents' combined energy a composite keeps, in (0, 1).
    pub composition_efficiency: f64,
    /// Fraction of a composite's energy each child receives, in (0, 0.5).
    pub decomposition_share: f64,
    /// Agents at this depth no longer compose.
    pub max_composition_depth: u32,
    /// Per-cycle Bernoulli spawn probability, in [0, 1].
    pub spawn_frequency: f64,
    /// Agents created when a spawn trial succeeds.
    pub spawn_batch: usize,
    pub recharge_rate: f64,
    pub energy_cap: f64,
    pub metabolic_decay: f64,
    /// Energy of spawned and seeded agents, in (0, energy_cap].
    pub initial_energy: f64,
    pub initial_population: usize,
    pub seed: u64,
    /// Kept last: serializes as a TOML table.
    pub decomposition_threshold: DecompositionThreshold,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            resonance_threshold: 0.85,
            energy_threshold: 10.0,
            composition_efficiency: 0.9,
            decomposition_share: 0.45,
            decomposition_threshold: DecompositionThreshold::default(),
            max_composition_depth: 5,
            spawn_frequency: 0.1,
            spawn_batch: 1,
            recharge_rate: 1.0,
            energy_cap: 100.0,
            metabolic_decay: 0.5,
            initial_energy: 50.0,
            initial_population: 20,
            seed: 42,
        }
    }
}

fn check(ok: bool, field: &'static str, reason: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(SwarmError::invalid(field, reason()))
    }
}

impl SwarmConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SwarmError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let r = self.resonance_threshold;
        check(r > 0.0 && r < 1.0, "resonance_threshold", || {
            format!("must be in (0, 1), got {r}")
        })?;

        let e = self.energy_threshold;
        check(e.is_finite() && e >= 0.0, "energy_threshold", || {
            format!("must be >= 0, got {e}")
        })?;

        let c = self.composition_efficiency;
        check(c > 0.0 && c < 1.0, "composition_efficiency", || {
            format!("must be in (0, 1), got {c}")
        })?;

        let d = self.decomposition_share;
        check(d > 0.0 && d < 0.5, "decomposition_share", || {
            format!("must be in (0, 0.5), got {d}")
        })?;

        let t = self.decomposition_threshold.value();
        check(t.is_finite(), "decomposition_threshold", || {
            format!("must be finite, got {t}")
        })?;

        let m = self.max_composition_depth;
        check(m >= 1, "max_composition_depth", || format!("must be >= 1, got {m}"))?;

        let s = self.spawn_frequency;
        check((0.0..=1.0).contains(&s), "spawn_frequency", || {
            format!("must be in [0, 1], got {s}")
        })?;

        check(self.spawn_batch >= 1, "spawn_batch", || "must be >= 1".to_string())?;

        let rr = self.recharge_rate;
        check(rr.is_finite() && rr >= 0.0, "recharge_rate", || {
            format!("must be >= 0, got {rr}")
        })?;

        let cap = self.energy_cap;
        check(cap.is_finite() && cap > 0.0, "energy_cap", || {
            format!("must be > 0, got {cap}")
        })?;

        let md = self.metabolic_decay;
        check(md.is_finite() && md >= 0.0, "metabolic_decay", || {
            format!("must be >= 0, got {md}")
        })?;

        let ie = self.initial_energy;
        check(ie > 0.0 && ie <= cap, "initial_energy", || {
            format!("must be in (0, energy_cap = {cap}], got {ie}")
        })?;

        Ok(())
    }
}
