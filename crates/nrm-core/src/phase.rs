use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::constants::{EPSILON, EULER, PERCENT_SCALE, PHI};
use crate::error::{Result, SwarmError};

/// Normalize an angle to [0, 2π).
fn normalize_phase(theta: f64) -> f64 {
    if !theta.is_finite() {
        return 0.0;
    }
    let wrapped = theta.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Circular mean of two angles along the shortest arc.
fn circular_mean(a: f64, b: f64) -> f64 {
    normalize_phase((a.sin() + b.sin()).atan2(a.cos() + b.cos()))
}

/// Position of an agent in phase space: one angle per transcendental axis
/// (π, e, φ) plus the magnitude of the metric vector that produced it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TranscendentalState {
    pub pi_phase: f64,
    pub e_phase: f64,
    pub phi_phase: f64,
    pub magnitude: f64,
}

impl TranscendentalState {
    /// Create a state with phases normalized to [0, 2π) and magnitude floored at 0.
    pub fn new(pi_phase: f64, e_phase: f64, phi_phase: f64, magnitude: f64) -> Self {
        Self {
            pi_phase: normalize_phase(pi_phase),
            e_phase: normalize_phase(e_phase),
            phi_phase: normalize_phase(phi_phase),
            magnitude: if magnitude.is_finite() {
                magnitude.max(0.0)
            } else {
                0.0
            },
        }
    }

    pub fn phases(&self) -> [f64; 3] {
        [self.pi_phase, self.e_phase, self.phi_phase]
    }

    pub fn is_degenerate(&self) -> bool {
        self.magnitude < EPSILON
    }

    /// Rotate every phase by `angle` radians.
    pub fn rotated(self, angle: f64) -> Self {
        Self::new(
            self.pi_phase + angle,
            self.e_phase + angle,
            self.phi_phase + angle,
            self.magnitude,
        )
    }

    /// Per-phase circular mean, arithmetic mean of magnitudes.
    pub fn blend(self, other: Self) -> Self {
        Self::new(
            circular_mean(self.pi_phase, other.pi_phase),
            circular_mean(self.e_phase, other.e_phase),
            circular_mean(self.phi_phase, other.phi_phase),
            (self.magnitude + other.magnitude) / 2.0,
        )
    }
}

impl PartialEq for TranscendentalState {
    fn eq(&self, other: &Self) -> bool {
        (self.pi_phase - other.pi_phase).abs() < EPSILON
            && (self.e_phase - other.e_phase).abs() < EPSILON
            && (self.phi_phase - other.phi_phase).abs() < EPSILON
            && (self.magnitude - other.magnitude).abs() < EPSILON
    }
}

/// Similarity between two states, in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResonanceMatch {
    pub similarity: f64,
}

impl ResonanceMatch {
    pub fn new(similarity: f64) -> Self {
        let similarity = if similarity.is_nan() {
            0.0
        } else {
            similarity.clamp(0.0, 1.0)
        };
        Self { similarity }
    }

    pub fn is_resonant(&self, threshold: f64) -> bool {
        self.similarity >= threshold
    }
}

/// Maps reality metrics into phase space and scores resonance between states.
#[derive(Clone, Copy, Debug)]
pub struct PhaseMapper {
    resonance_threshold: f64,
}

impl Default for PhaseMapper {
    fn default() -> Self {
        Self {
            resonance_threshold: 0.85,
        }
    }
}

impl PhaseMapper {
    pub fn new(resonance_threshold: f64) -> Result<Self> {
        if !(resonance_threshold > 0.0 && resonance_threshold < 1.0) {
            return Err(SwarmError::invalid(
                "resonance_threshold",
                format!("must be in (0, 1), got {resonance_threshold}"),
            ));
        }
        Ok(Self {
            resonance_threshold,
        })
    }

    pub fn resonance_threshold(&self) -> f64 {
        self.resonance_threshold
    }

    /// Deterministic transform of a metric map into a `TranscendentalState`.
    ///
    /// Metrics are visited in key order; the i-th (1-based) metric, scaled to
    /// `v = x / 100`, advances the three phases by `v·π·i`, `v·e·i` and `v·φ·i`.
    /// Magnitude is the Euclidean norm of the scaled vector.
    pub fn reality_to_phase(&self, metrics: &BTreeMap<String, f64>) -> TranscendentalState {
        let mut pi_acc = 0.0;
        let mut e_acc = 0.0;
        let mut phi_acc = 0.0;
        let mut norm_sq = 0.0;

        for (i, value) in metrics.values().enumerate() {
            let v = if value.is_finite() {
                value / PERCENT_SCALE
            } else {
                0.0
            };
            let weight = (i + 1) as f64;
            pi_acc += v * PI * weight;
            e_acc += v * EULER * weight;
            phi_acc += v * PHI * weight;
            norm_sq += v * v;
        }

        TranscendentalState::new(pi_acc, e_acc, phi_acc, norm_sq.sqrt())
    }

    /// Mean over the three phase axes of `(1 + cos Δ) / 2`.
    /// Symmetric, 1.0 for identical states, 0.0 if either state is degenerate.
    pub fn detect_resonance(
        &self,
        a: &TranscendentalState,
        b: &TranscendentalState,
    ) -> ResonanceMatch {
        if a.is_degenerate() || b.is_degenerate() {
            return ResonanceMatch::new(0.0);
        }
        let sum: f64 = a
            .phases()
            .iter()
            .zip(b.phases().iter())
            .map(|(x, y)| (1.0 + (x - y).cos()) / 2.0)
            .sum();
        ResonanceMatch::new(sum / 3.0)
    }
}
