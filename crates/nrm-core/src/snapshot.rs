use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One immutable sample of the environment an agent is grounded in.
///
/// The fixed host fields cover the metrics every gateway can report; `extra`
/// carries any additional named metrics an alternate source wants to feed
/// into phase space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealitySnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    /// Unix seconds at capture. Not a phase input.
    pub timestamp: f64,
    pub process_count: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
}

impl RealitySnapshot {
    /// Snapshot of the given load, stamped with the current time.
    pub fn new(
        cpu_percent: f64,
        memory_percent: f64,
        disk_percent: f64,
        process_count: u64,
    ) -> Self {
        Self::at(
            cpu_percent,
            memory_percent,
            disk_percent,
            process_count,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
        )
    }

    /// Snapshot with an explicit timestamp, for reproducible sources.
    pub fn at(
        cpu_percent: f64,
        memory_percent: f64,
        disk_percent: f64,
        process_count: u64,
        timestamp: f64,
    ) -> Self {
        Self {
            cpu_percent,
            memory_percent,
            disk_percent,
            timestamp,
            process_count,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Named metric map in sorted key order. Extras never shadow the host fields.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.extra.clone();
        metrics.insert("cpu_percent".to_string(), self.cpu_percent);
        metrics.insert("memory_percent".to_string(), self.memory_percent);
        metrics.insert("disk_percent".to_string(), self.disk_percent);
        metrics.insert("process_count".to_string(), self.process_count as f64);
        metrics
    }

    /// Spare capacity in [0, 1]: product of idle CPU and free memory fractions.
    pub fn idle_fraction(&self) -> f64 {
        let cpu_idle = (1.0 - self.cpu_percent / 100.0).clamp(0.0, 1.0);
        let mem_free = (1.0 - self.memory_percent / 100.0).clamp(0.0, 1.0);
        if cpu_idle.is_nan() || mem_free.is_nan() {
            return 0.0;
        }
        cpu_idle * mem_free
    }
}
