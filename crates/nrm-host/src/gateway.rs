use nrm_core::{RealityGateway, RealitySnapshot, Result, SwarmError};
use sysinfo::{Disks, System};

/// `used / total` as a percentage in [0, 100]. `None` when nothing is
/// reported (`total == 0`).
pub fn usage_percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some((used as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
}

/// Samples the live host through `sysinfo`.
///
/// CPU usage is a delta between refreshes, so the first capture after
/// construction reads low; the orchestrator's cycle cadence supplies the
/// interval for every capture after that.
pub struct HostGateway {
    sys: System,
    disks: Disks,
}

impl HostGateway {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        tracing::debug!(
            "host gateway ready: {} cpus, {} disks, {} bytes memory",
            sys.cpus().len(),
            disks.list().len(),
            sys.total_memory()
        );
        Self { sys, disks }
    }

    fn disk_percent(&self) -> f64 {
        let (used, total) = self
            .disks
            .list()
            .iter()
            .fold((0u64, 0u64), |(used, total), disk| {
                let t = disk.total_space();
                let u = t.saturating_sub(disk.available_space());
                (used.saturating_add(u), total.saturating_add(t))
            });
        // Diskless containers report nothing; treat as empty rather than failing.
        usage_percent(used, total).unwrap_or(0.0)
    }
}

impl Default for HostGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl RealityGateway for HostGateway {
    fn capture_snapshot(&mut self) -> Result<RealitySnapshot> {
        self.sys.refresh_cpu();
        self.sys.refresh_memory();
        self.sys.refresh_processes();
        self.disks.refresh();

        let memory_percent = usage_percent(self.sys.used_memory(), self.sys.total_memory())
            .ok_or_else(|| {
                SwarmError::MetricsUnavailable("host reports zero total memory".to_string())
            })?;

        let cpu = self.sys.global_cpu_info().cpu_usage() as f64;
        let cpu_percent = if cpu.is_finite() {
            cpu.clamp(0.0, 100.0)
        } else {
            0.0
        };

        let snapshot = RealitySnapshot::new(
            cpu_percent,
            memory_percent,
            self.disk_percent(),
            self.sys.processes().len() as u64,
        );
        tracing::trace!(
            "host snapshot: cpu={:.1}% mem={:.1}% disk={:.1}% procs={}",
            snapshot.cpu_percent,
            snapshot.memory_percent,
            snapshot.disk_percent,
            snapshot.process_count
        );
        Ok(snapshot)
    }
}
