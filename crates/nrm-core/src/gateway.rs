//! Metric sources the orchestrator samples once per cycle.
//!
//! The engine never reaches for global host state: a gateway is constructed
//! by the caller and handed to the orchestrator, so tests can substitute a
//! fixed or scripted source and get reproducible runs.

use crate::error::{Result, SwarmError};
use crate::snapshot::RealitySnapshot;

pub trait RealityGateway {
    /// Sample the environment. Fails with `MetricsUnavailable` when no
    /// source answers; retry policy belongs to the caller.
    fn capture_snapshot(&mut self) -> Result<RealitySnapshot>;
}

impl<G: RealityGateway + ?Sized> RealityGateway for Box<G> {
    fn capture_snapshot(&mut self) -> Result<RealitySnapshot> {
        (**self).capture_snapshot()
    }
}

/// Returns the same snapshot on every capture.
#[derive(Clone, Debug)]
pub struct FixedGateway {
    snapshot: RealitySnapshot,
}

impl FixedGateway {
    pub fn new(snapshot: RealitySnapshot) -> Self {
        Self { snapshot }
    }

    /// Fixed load with a zero timestamp.
    pub fn load(cpu_percent: f64, memory_percent: f64) -> Self {
        Self::new(RealitySnapshot::at(cpu_percent, memory_percent, 0.0, 0, 0.0))
    }
}

impl RealityGateway for FixedGateway {
    fn capture_snapshot(&mut self) -> Result<RealitySnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Replays a recorded sequence of snapshots.
#[derive(Clone, Debug)]
pub struct ScriptedGateway {
    script: Vec<RealitySnapshot>,
    cursor: usize,
    cycle: bool,
}

impl ScriptedGateway {
    /// Plays the script once; captures past the end fail.
    pub fn once(script: Vec<RealitySnapshot>) -> Self {
        Self {
            script,
            cursor: 0,
            cycle: false,
        }
    }

    /// Plays the script and wraps around forever.
    pub fn cycling(script: Vec<RealitySnapshot>) -> Self {
        Self {
            script,
            cursor: 0,
            cycle: true,
        }
    }

    pub fn remaining(&self) -> usize {
        if self.cycle && !self.script.is_empty() {
            return usize::MAX;
        }
        self.script.len().saturating_sub(self.cursor)
    }
}

impl RealityGateway for ScriptedGateway {
    fn capture_snapshot(&mut self) -> Result<RealitySnapshot> {
        if self.script.is_empty() {
            return Err(SwarmError::MetricsUnavailable("empty script".to_string()));
        }
        if self.cursor >= self.script.len() {
            if !self.cycle {
                return Err(SwarmError::MetricsUnavailable(format!(
                    "script exhausted after {} snapshots",
                    self.script.len()
                )));
            }
            self.cursor = 0;
        }
        let snap = self.script[self.cursor].clone();
        self.cursor += 1;
        Ok(snap)
    }
}

/// Adapts an injected capture closure.
pub struct FnGateway<F> {
    capture: F,
}

impl<F> FnGateway<F>
where
    F: FnMut() -> Result<RealitySnapshot>,
{
    pub fn new(capture: F) -> Self {
        Self { capture }
    }
}

impl<F> RealityGateway for FnGateway<F>
where
    F: FnMut() -> Result<RealitySnapshot>,
{
    fn capture_snapshot(&mut self) -> Result<RealitySnapshot> {
        (self.capture)()
    }
}
