//! Observable counters and per-session/per-slot reports (spec.md §4.N,
//! §6 "Participant metrics expose, per session: source id, CNAME,
//! source address, e2e latency (mean + variance), jitter, packet loss
//! ratio, FEC recovery ratio, current PLC activity, watchdog state,
//! resampler rate adjustment ppm").
//!
//! The `Display` impls are a supplement pulled from `original_source`
//! (roc-toolkit's metrics types render themselves for log lines); we
//! carry that convention here since `bass-webrtc-ndi` similarly formats
//! its stats structs for `log::info!` rather than requiring callers to
//! destructure fields.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::session::watchdog::WatchdogState;

/// Per-session reception counters, derived rates, and the identity a
/// dashboard needs to label the row (spec.md §6).
#[derive(Debug, Clone)]
pub struct ParticipantMetrics {
    pub source_id: u64,
    pub cname: Option<String>,
    pub source_addr: SocketAddr,

    pub packets_received: u64,
    pub packets_lost: u64,
    pub packets_recovered_by_fec: u64,
    pub packets_dropped_late: u64,
    pub concealed_frames: u64,

    /// Mean end-to-end latency, nanoseconds (`LatencyMonitor::mean_latency_ns`).
    pub mean_latency_ns: f64,
    /// Latency variance expressed as its square root (`LatencyMonitor::jitter_ns`).
    pub jitter_ns: f64,

    pub plc_active: bool,
    pub watchdog_state: WatchdogState,
    /// Resampler's current rate trim (`Resampler::frequency_ppm`).
    pub resampler_ppm: f64,
}

impl Default for ParticipantMetrics {
    fn default() -> Self {
        Self {
            source_id: 0,
            cname: None,
            source_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            packets_received: 0,
            packets_lost: 0,
            packets_recovered_by_fec: 0,
            packets_dropped_late: 0,
            concealed_frames: 0,
            mean_latency_ns: 0.0,
            jitter_ns: 0.0,
            plc_active: false,
            watchdog_state: WatchdogState::Healthy,
            resampler_ppm: 0.0,
        }
    }
}

impl ParticipantMetrics {
    /// Fraction of this session's packets (received + outright lost)
    /// that never arrived and were never recovered by FEC.
    pub fn packet_loss_ratio(&self) -> f64 {
        let total = self.packets_received + self.packets_lost;
        if total == 0 {
            0.0
        } else {
            self.packets_lost as f64 / total as f64
        }
    }

    /// Fraction of would-be losses that FEC actually recovered.
    pub fn fec_recovery_ratio(&self) -> f64 {
        let candidates = self.packets_lost + self.packets_recovered_by_fec;
        if candidates == 0 {
            0.0
        } else {
            self.packets_recovered_by_fec as f64 / candidates as f64
        }
    }
}

impl fmt::Display for ParticipantMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source={} cname={} addr={} rx={} lost={} fec_recovered={} dropped_late={} \
             loss_ratio={:.3} fec_ratio={:.3} latency={:.1}ns jitter={:.1}ns concealed={} \
             plc_active={} watchdog={:?} resampler_ppm={:.1}",
            self.source_id,
            self.cname.as_deref().unwrap_or("-"),
            self.source_addr,
            self.packets_received,
            self.packets_lost,
            self.packets_recovered_by_fec,
            self.packets_dropped_late,
            self.packet_loss_ratio(),
            self.fec_recovery_ratio(),
            self.mean_latency_ns,
            self.jitter_ns,
            self.concealed_frames,
            self.plc_active,
            self.watchdog_state,
            self.resampler_ppm,
        )
    }
}

/// Aggregate metrics for one slot (all sessions routed through it).
#[derive(Debug, Clone, Default)]
pub struct SlotMetrics {
    pub num_sessions: usize,
    pub frames_produced: u64,
    pub frames_underrun: u64,
}

impl fmt::Display for SlotMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sessions={} produced={} underrun={}",
            self.num_sessions, self.frames_produced, self.frames_underrun
        )
    }
}
