//! Per-sender DSP chain (spec.md §4.G): sorted queue → delayed reader →
//! FEC reader → validator → depacketizer → PLC → resampler → watchdog
//! → latency monitor → mixer input.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use crate::audio::depacketizer::Depacketizer;
use crate::audio::frame::Frame;
use crate::audio::plc::{PlcBackend, PlcStage};
use crate::audio::resampler::Resampler;
use crate::audio::sample_spec::SampleSpec;
use crate::audio::validator::{ValidationOutcome, Validator, ValidatorConfig};
use crate::config::{EncodingMap, SessionDefaults};
use crate::metrics::ParticipantMetrics;
use crate::packet::packet::Packet;

use super::delayed_reader::DelayedReader;
use super::fec_reader::{FecCodec, FecReader};
use super::latency_monitor::LatencyMonitor;
use super::sorted_queue::SortedQueue;
use super::watchdog::{Watchdog, WatchdogConfig};

pub type SessionId = u64;

/// A session's per-sender DSP chain instance, plus identity and
/// termination state (spec.md §3 "Session").
pub struct Session {
    pub id: SessionId,
    pub source_addr: SocketAddr,
    pub main_ssrc: u32,

    source_queue: SortedQueue,
    /// FIFO of repair packets awaiting FEC bookkeeping. Repair packets
    /// carry no RTP sequence number, so they can't go through
    /// `SortedQueue` (which keys on one) — shard ordering within a block
    /// is `FecReader`'s job, not this queue's.
    repair_queue: VecDeque<Packet>,
    delayed_reader: DelayedReader,
    fec_reader: FecReader,
    validator: Validator,
    depacketizer: Depacketizer,
    plc: PlcStage,
    resampler: Resampler,
    watchdog: Watchdog,
    latency_monitor: LatencyMonitor,

    samples_per_packet: u64,
    ns_per_sample: f64,

    metrics: ParticipantMetrics,
    terminated: bool,
}

pub struct SessionParams {
    pub id: SessionId,
    pub source_addr: SocketAddr,
    pub main_ssrc: u32,
    pub in_spec: SampleSpec,
    pub samples_per_packet: u64,
    pub defaults: SessionDefaults,
    pub plc_backend: Box<dyn PlcBackend>,
    pub fec_codec: Box<dyn FecCodec>,
}

impl Session {
    pub fn new(params: SessionParams) -> Self {
        let sample_rate = params.in_spec.sample_rate;
        let target_packets =
            ((params.defaults.target_latency.as_secs_f64() * sample_rate as f64) / params.samples_per_packet.max(1) as f64)
                .ceil() as usize;
        let plc_horizon_frames =
            (params.defaults.plc_horizon.as_secs_f64() * sample_rate as f64) as usize;

        Self {
            id: params.id,
            source_addr: params.source_addr,
            main_ssrc: params.main_ssrc,
            source_queue: SortedQueue::new(params.defaults.sorted_queue_capacity),
            repair_queue: VecDeque::new(),
            delayed_reader: DelayedReader::new(target_packets.max(1)),
            fec_reader: FecReader::new(params.fec_codec, params.defaults.fec_block_window),
            validator: Validator::new(ValidatorConfig {
                expected_payload_type: None,
                max_seq_gap: params.defaults.max_seq_gap,
                expected_sample_rate: sample_rate,
                encoding_map: EncodingMap::default(),
            }),
            depacketizer: Depacketizer::new(params.in_spec, params.samples_per_packet),
            plc: PlcStage::new(params.plc_backend, plc_horizon_frames.max(1)),
            resampler: Resampler::new(1),
            watchdog: Watchdog::new(WatchdogConfig {
                no_playback_timeout: params.defaults.no_playback_timeout,
                silence_timeout: params.defaults.silence_timeout,
                gap_timeout: params.defaults.gap_timeout,
            }),
            latency_monitor: LatencyMonitor::new(64, target_packets as f64 * params.samples_per_packet as f64),
            samples_per_packet: params.samples_per_packet,
            ns_per_sample: 1_000_000_000.0 / sample_rate.max(1) as f64,
            metrics: ParticipantMetrics {
                source_id: params.id,
                source_addr: params.source_addr,
                ..ParticipantMetrics::default()
            },
            terminated: false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn metrics(&self) -> &ParticipantMetrics {
        &self.metrics
    }

    /// Called once RTCP SDES correlates this session's main SSRC to a
    /// CNAME (spec.md §6: metrics expose CNAME per session).
    pub fn set_cname(&mut self, cname: String) {
        self.metrics.cname = Some(cname);
    }

    /// Route one inbound packet into this session's DSP chain. Ordering
    /// and duplicate-rejection happen in the sorted queue itself;
    /// protocol validation runs later, once `read_frame` pops a packet
    /// back out in sequence order (spec.md §4.G: sorted-queue feeds the
    /// validator, not the other way around — a packet arriving out of
    /// order must still get reordered rather than rejected on arrival).
    pub fn push_packet(&mut self, packet: Packet) {
        if packet.flags.repair {
            self.repair_queue.push_back(packet);
        } else {
            // Source packets carrying an FEC footer still need to reach
            // the reader's block bookkeeping, or a block's received-shard
            // count never reflects shards that arrived normally.
            if packet.fec.is_some() {
                let recovered = self.fec_reader.push(packet.clone());
                self.route_recovered(recovered);
            }
            self.source_queue.push(packet);
        }
    }

    fn route_recovered(&mut self, recovered: Vec<Packet>) {
        for packet in recovered {
            self.metrics.packets_recovered_by_fec += 1;
            self.source_queue.push(packet);
        }
    }

    /// Pull one ready frame through the DSP chain, if the delayed
    /// reader has enough backlog, running FEC recovery on the way in.
    pub fn read_frame(&mut self, now_ns: u64) -> Option<Frame> {
        while let Some(repair) = self.repair_queue.pop_front() {
            let recovered = self.fec_reader.push(repair);
            self.route_recovered(recovered);
        }

        let packet = self.delayed_reader.read(&mut self.source_queue)?;

        match self.validator.validate(&packet) {
            ValidationOutcome::Accept => {
                self.metrics.packets_received += 1;
            }
            ValidationOutcome::Reject => {
                self.metrics.packets_dropped_late += 1;
                return None;
            }
            ValidationOutcome::Fatal => {
                self.terminated = true;
                return None;
            }
        }

        let (gap, frame) = self.depacketizer.depacketize(&packet, now_ns);

        if let Some(gap_frame) = gap {
            self.watchdog.on_gap(now_ns, true);
            let missing_packets = gap_frame.num_frames() as u64 / self.samples_per_packet.max(1);
            self.metrics.packets_lost += missing_packets;
            self.metrics.concealed_frames += gap_frame.num_frames() as u64;
            self.plc.conceal_gap(gap_frame.num_frames(), gap_frame.num_channels(), now_ns);
        } else {
            self.watchdog.on_gap(now_ns, false);
        }

        self.plc.on_original(&frame);
        self.watchdog.on_playable_frame(now_ns);

        // True e2e latency needs an RTCP SR NTP mapping this receiver
        // doesn't correlate yet; queueing depth is the measurable proxy
        // until that lands.
        let backlog_samples = self.source_queue.len() as f64 * self.samples_per_packet as f64;
        self.latency_monitor.record_backlog(backlog_samples);
        self.latency_monitor.record_latency(backlog_samples * self.ns_per_sample);

        self.metrics.mean_latency_ns = self.latency_monitor.mean_latency_ns();
        self.metrics.jitter_ns = self.latency_monitor.jitter_ns();
        self.metrics.plc_active = self.plc.is_active();
        self.metrics.watchdog_state = self.watchdog.state(now_ns);
        self.metrics.resampler_ppm = self.resampler.frequency_ppm();

        if self.watchdog.is_dead(now_ns) {
            self.terminated = true;
        }

        Some(frame)
    }

    /// Earliest deadline at which this session's internal timers need
    /// another refresh (spec.md §4.G `refresh(now)`).
    pub fn refresh(&mut self, now_ns: u64) -> u64 {
        if self.watchdog.is_dead(now_ns) {
            self.terminated = true;
        }
        now_ns + Duration::from_millis(10).as_nanos() as u64
    }

    /// Compares the sink clock against RTP timestamps and feeds the
    /// resampler's PI loop (spec.md §4.G `reclock`).
    pub fn reclock(&mut self, _playback_time_ns: u64) {
        let deviation = self.latency_monitor.backlog_deviation();
        self.resampler.adjust(deviation, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::channel_set::{ChannelLayout, ChannelOrder, ChannelSet};
    use crate::audio::plc::RepeatDecayPlc;
    use crate::audio::sample_spec::SampleFormat;
    use crate::session::group::NullFecCodec;
    use std::net::{IpAddr, Ipv4Addr};

    fn stereo_spec() -> SampleSpec {
        let cs = ChannelSet::from_mask(ChannelLayout::Surround, ChannelOrder::Smpte, 0b11);
        SampleSpec::new(48_000, SampleFormat::I16, cs)
    }

    fn new_session(target_latency_ms: u64) -> Session {
        // target_packets = ceil(target_latency * sample_rate / samples_per_packet),
        // then floored at 1 by `DelayedReader::new` — 0ms latency means
        // the delayed reader drains as soon as a single packet arrives.
        let defaults = SessionDefaults {
            target_latency: Duration::from_millis(target_latency_ms),
            sorted_queue_capacity: 64,
            ..SessionDefaults::default()
        };
        Session::new(SessionParams {
            id: 1,
            source_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5004),
            main_ssrc: 0x1234,
            in_spec: stereo_spec(),
            samples_per_packet: 4,
            defaults,
            plc_backend: Box::new(RepeatDecayPlc),
            fec_codec: Box::new(NullFecCodec),
        })
    }

    fn packet(seq: u16, ts: u32, pt: u8) -> Packet {
        let mut buf = vec![0u8; 12 + 16];
        buf[0] = 0x80;
        buf[1] = pt;
        buf[2..4].copy_from_slice(&seq.to_be_bytes());
        buf[4..8].copy_from_slice(&ts.to_be_bytes());
        let mut p = Packet::new(buf.clone());
        p.rtp = Some(crate::packet::rtp::parse_rtp_header(&buf).unwrap());
        p.flags.audio = true;
        p
    }

    #[test]
    fn packets_pushed_out_of_order_are_read_back_in_sequence() {
        // Pushed as seq 2 then seq 1: if the validator saw them in that
        // raw arrival order it would reject/terminate on a non-positive
        // sequence diff. The sorted queue reorders them first, so both
        // reads succeed and the session survives.
        let mut session = new_session(0);
        session.push_packet(packet(2, 8, 96));
        session.push_packet(packet(1, 4, 96));

        assert!(session.read_frame(0).is_some());
        assert!(session.read_frame(1).is_some());
        assert!(!session.is_terminated());
    }

    #[test]
    fn payload_type_change_terminates_the_session() {
        let mut session = new_session(0);
        session.push_packet(packet(1, 4, 96));
        session.read_frame(0);
        session.push_packet(packet(2, 8, 97));
        session.read_frame(1);
        assert!(session.is_terminated());
    }

    #[test]
    fn metrics_carry_identity_set_at_construction() {
        let session = new_session(0);
        assert_eq!(session.metrics().source_id, 1);
        assert_eq!(session.metrics().source_addr.port(), 5004);
        assert_eq!(session.metrics().cname, None);
    }

    #[test]
    fn set_cname_is_reflected_in_metrics() {
        let mut session = new_session(0);
        session.set_cname("alice@host".to_string());
        assert_eq!(session.metrics().cname.as_deref(), Some("alice@host"));
    }

    #[test]
    fn skipped_sequence_counts_as_packet_loss_and_plc_activity() {
        let mut session = new_session(0);
        session.push_packet(packet(1, 4, 96));
        session.read_frame(0);

        // seq 2 never arrives; seq 3 arrives next.
        session.push_packet(packet(3, 12, 96));
        session.read_frame(1);

        assert_eq!(session.metrics().packets_lost, 1);
        assert_eq!(session.metrics().concealed_frames, 4); // 1 missing packet * 4 samples/packet
        assert!(session.metrics().plc_active);
    }
}
