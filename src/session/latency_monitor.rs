//! Measures end-to-end latency from RTCP-derived remote timing plus
//! local observation; maintains moving statistics; publishes to metrics
//! (spec.md §4.G "Latency monitor").

use crate::stats::{MovAvg, MovMinMax};

pub struct LatencyMonitor {
    latency_ns: MovAvg,
    backlog: MovMinMax,
    target_backlog_samples: f64,
}

impl LatencyMonitor {
    pub fn new(window: usize, target_backlog_samples: f64) -> Self {
        Self { latency_ns: MovAvg::new(window), backlog: MovMinMax::new(window), target_backlog_samples }
    }

    /// Record one latency observation: local receipt time minus the RTP
    /// timestamp translated through the last RTCP sender report's NTP
    /// mapping (the mapping itself lives in `Session`, which owns the
    /// RTCP correlation; this records the already-computed delta).
    pub fn record_latency(&mut self, latency_ns: f64) {
        self.latency_ns.add(latency_ns);
    }

    pub fn record_backlog(&mut self, backlog_samples: f64) {
        self.backlog.add(backlog_samples);
    }

    pub fn mean_latency_ns(&self) -> f64 {
        self.latency_ns.mov_avg()
    }

    pub fn jitter_ns(&self) -> f64 {
        self.latency_ns.mov_variance().sqrt()
    }

    /// `target_backlog - actual_backlog`, fed to the resampler's PI
    /// controller (spec.md §4.G: "measured deviation... feeds a bounded
    /// PI-style controller").
    pub fn backlog_deviation(&self) -> f64 {
        let actual = self.backlog.mov_max().unwrap_or(self.target_backlog_samples);
        self.target_backlog_samples - actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_mean_latency() {
        let mut m = LatencyMonitor::new(10, 480.0);
        for x in [10.0, 12.0, 11.0] {
            m.record_latency(x);
        }
        assert!((m.mean_latency_ns() - 11.0).abs() < 1.0);
    }

    #[test]
    fn backlog_deviation_reflects_target_gap() {
        let mut m = LatencyMonitor::new(10, 480.0);
        m.record_backlog(400.0);
        assert!(m.backlog_deviation() > 0.0);
    }
}
