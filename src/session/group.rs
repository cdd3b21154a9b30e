//! Session Group (spec.md §4.H): creates/destroys sessions, routes
//! packets to them, and drives RTCP reporting via `IReceiverHooks`.

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::audio::frame::Frame;
use crate::audio::plc::RepeatDecayPlc;
use crate::audio::sample_spec::SampleSpec;
use crate::config::SessionDefaults;
use crate::metrics::ParticipantMetrics;
use crate::packet::packet::Packet;
use crate::packet::rtcp::RtcpPacket;

use super::fec_reader::FecCodec;
use super::router::{SessionId, SessionRouter};
use super::session::{Session, SessionParams};

/// Callbacks an RTCP session implementation drives into the router and
/// back out to per-session telemetry (spec.md §4.H).
pub trait ReceiverHooks {
    fn on_update_source(&mut self, ssrc: u32, cname: &str);
    fn on_remove_source(&mut self, ssrc: u32);
    fn on_get_num_sources(&self) -> usize;
    fn on_get_reception_metrics(&self, ssrc: u32) -> Option<ParticipantMetrics>;
    fn on_add_sending_metrics(&mut self, ssrc: u32, report: &RtcpPacket);
    fn on_add_link_metrics(&mut self, ssrc: u32, report: &RtcpPacket);
}

/// Placeholder for a reconstruction codec when none is wired in yet —
/// blocks simply never recover. Real RS8M/LDPC math is an external
/// collaborator per spec.md §1.
pub struct NullFecCodec;
impl FecCodec for NullFecCodec {
    fn reconstruct(&self, _block: &super::fec_reader::FecBlock, _missing_shard: u16) -> Option<Vec<u8>> {
        None
    }
}

pub struct SessionGroup {
    router: SessionRouter,
    sessions: HashMap<SessionId, Session>,
    next_session_id: SessionId,
    in_spec: SampleSpec,
    samples_per_packet: u64,
    defaults: SessionDefaults,
    address_allowlist: Vec<String>,
}

impl SessionGroup {
    pub fn new(
        in_spec: SampleSpec,
        samples_per_packet: u64,
        defaults: SessionDefaults,
        address_allowlist: Vec<String>,
    ) -> Self {
        Self {
            router: SessionRouter::new(),
            sessions: HashMap::new(),
            next_session_id: 0,
            in_spec,
            samples_per_packet,
            defaults,
            address_allowlist,
        }
    }

    fn address_allowed(&self, addr: SocketAddr) -> bool {
        self.address_allowlist.is_empty() || self.address_allowlist.iter().any(|a| a == &addr.ip().to_string())
    }

    /// Route `packet` to its matching session, creating one if the
    /// packet is a plausible audio source and no session claims it yet
    /// (spec.md §4.H: "no session created from a lone repair or control
    /// packet"). RTCP packets never reach the router: they're dispatched
    /// straight into `ReceiverHooks`.
    pub fn handle_packet(&mut self, packet: Packet) {
        if let Some(rtcp) = packet.rtcp {
            self.handle_rtcp_packet(rtcp);
            return;
        }

        let Some(src_addr) = packet.src_addr else {
            return;
        };

        let session_id = match packet.rtp {
            Some(header) => self.router.find_by_source(header.ssrc).or_else(|| {
                if packet.flags.audio && !packet.flags.repair && self.address_allowed(src_addr) {
                    let id = self.next_session_id;
                    self.next_session_id += 1;
                    let params = SessionParams {
                        id,
                        source_addr: src_addr,
                        main_ssrc: header.ssrc,
                        in_spec: self.in_spec.clone(),
                        samples_per_packet: self.samples_per_packet,
                        defaults: self.defaults.clone(),
                        plc_backend: Box::new(RepeatDecayPlc),
                        fec_codec: Box::new(NullFecCodec),
                    };
                    self.sessions.insert(id, Session::new(params));
                    if self.router.add_session(id, header.ssrc, src_addr).is_err() {
                        self.sessions.remove(&id);
                        return None;
                    }
                    Some(id)
                } else {
                    None
                }
            }),
            None => self.router.find_by_address(src_addr),
        };

        if let Some(id) = session_id {
            if let Some(session) = self.sessions.get_mut(&id) {
                session.push_packet(packet);
            }
        }
    }

    /// Dispatch one parsed RTCP packet into the `ReceiverHooks` contract
    /// (spec.md §4.H): SDES correlates CNAME to SSRC, BYE tears down a
    /// source's routing, SR/RR feed sending/link metrics.
    fn handle_rtcp_packet(&mut self, rtcp: RtcpPacket) {
        match &rtcp {
            RtcpPacket::SourceDescription(sd) => {
                if let Some(cname) = &sd.cname {
                    self.on_update_source(sd.ssrc, cname);
                }
            }
            RtcpPacket::Bye(bye) => {
                for &ssrc in &bye.sources {
                    self.on_remove_source(ssrc);
                }
            }
            RtcpPacket::SenderReport(sr) => {
                self.on_add_sending_metrics(sr.ssrc, &rtcp);
            }
            RtcpPacket::ReceiverReport(rr) => {
                self.on_add_link_metrics(rr.ssrc, &rtcp);
            }
        }
    }

    /// Pull one frame from every live session (for the mixer).
    pub fn read_all(&mut self, now_ns: u64) -> Vec<Frame> {
        self.sessions.values_mut().filter_map(|s| s.read_frame(now_ns)).collect()
    }

    /// Remove terminated sessions; returns the minimum refresh deadline
    /// across the ones remaining (spec.md §4.H `refresh_sessions`).
    pub fn refresh_sessions(&mut self, now_ns: u64) -> u64 {
        let terminated: Vec<SessionId> =
            self.sessions.iter().filter(|(_, s)| s.is_terminated()).map(|(&id, _)| id).collect();
        for id in terminated {
            self.sessions.remove(&id);
            self.router.remove_session(id);
        }

        self.sessions
            .values_mut()
            .map(|s| s.refresh(now_ns))
            .min()
            .unwrap_or(now_ns + 10_000_000)
    }

    pub fn num_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = (&SessionId, &mut Session)> {
        self.sessions.iter_mut()
    }
}

impl ReceiverHooks for SessionGroup {
    fn on_update_source(&mut self, ssrc: u32, cname: &str) {
        let _ = self.router.link_source(ssrc, cname);
        if let Some(id) = self.router.find_by_source(ssrc) {
            if let Some(session) = self.sessions.get_mut(&id) {
                session.set_cname(cname.to_string());
            }
        }
    }

    fn on_remove_source(&mut self, ssrc: u32) {
        self.router.unlink_source(ssrc);
    }

    fn on_get_num_sources(&self) -> usize {
        self.sessions.len()
    }

    fn on_get_reception_metrics(&self, ssrc: u32) -> Option<ParticipantMetrics> {
        let id = self.router.find_by_source(ssrc)?;
        self.sessions.get(&id).map(|s| s.metrics().clone())
    }

    fn on_add_sending_metrics(&mut self, _ssrc: u32, _report: &RtcpPacket) {
        // Sending-side metrics apply to the symmetric sender pipeline,
        // out of scope here (spec.md §1).
    }

    fn on_add_link_metrics(&mut self, _ssrc: u32, _report: &RtcpPacket) {}
}
