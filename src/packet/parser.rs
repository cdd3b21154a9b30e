//! Chainable parser/composer traits (spec.md §4.D).
//!
//! "A parser may wrap another parser": `RTP+FEC-RS8M-Source` parses RTP
//! then the FEC source footer; `FEC-RS8M-Repair` parses the FEC header
//! only. Composers are the dual, reserving and filling headers on
//! outbound packets; the receiver pipeline only needs the parse side,
//! so composers aren't implemented here (no outbound path in scope).

use super::fec::{self, FecHeader};
use super::packet::Packet;
use super::rtcp;
use super::rtp;
use crate::error::Status;

/// One parsing stage in a chain. Each stage consumes (and may delegate
/// to) a previous stage's output, filling in the packet's headers.
pub trait PacketParser: Send + Sync {
    fn parse(&self, packet: &mut Packet) -> Result<(), Status>;
}

/// Parses an RTP header and marks the packet audio/repair accordingly.
pub struct RtpParser;

impl PacketParser for RtpParser {
    fn parse(&self, packet: &mut Packet) -> Result<(), Status> {
        let header = rtp::parse_rtp_header(packet.bytes())?;
        packet.flags.prepared = true;
        packet.flags.audio = true;
        packet.rtp = Some(header);
        Ok(())
    }
}

/// Wraps `RtpParser`, then parses a trailing FEC source footer.
pub struct RtpFecSourceParser {
    inner: RtpParser,
}

impl RtpFecSourceParser {
    pub fn new() -> Self {
        Self { inner: RtpParser }
    }
}

impl Default for RtpFecSourceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketParser for RtpFecSourceParser {
    fn parse(&self, packet: &mut Packet) -> Result<(), Status> {
        self.inner.parse(packet)?;
        let footer = fec::parse_source_footer(packet.bytes())?;
        packet.fec = Some(FecHeader::Source(footer));
        Ok(())
    }
}

/// Parses a standalone FEC repair packet (no RTP header present).
pub struct FecRepairParser;

impl PacketParser for FecRepairParser {
    fn parse(&self, packet: &mut Packet) -> Result<(), Status> {
        let (header, _len) = fec::parse_repair_header(packet.bytes())?;
        packet.flags.prepared = true;
        packet.flags.repair = true;
        packet.fec = Some(FecHeader::Repair(header));
        Ok(())
    }
}

/// Parses an RTCP compound packet's first entry.
pub struct RtcpParser;

impl PacketParser for RtcpParser {
    fn parse(&self, packet: &mut Packet) -> Result<(), Status> {
        let (parsed, _len) = rtcp::parse_rtcp_packet(packet.bytes())?;
        packet.flags.prepared = true;
        packet.flags.control = true;
        packet.rtcp = Some(parsed);
        Ok(())
    }
}
