//! Packet: a pool-allocated, reference-counted buffer plus parsed
//! headers and flags (spec.md §3 "Packet").
//!
//! Grounded on `bass-rtp::rtp::socket::RtpSocket`'s raw receive buffers
//! and `bass-aes67::input::rtp::RtpPacket`'s parsed-header pattern;
//! generalized here to also carry optional FEC/RTCP headers and
//! transport metadata in one type, per spec.md's "carries raw buffer
//! slice, parsed headers... flags... source/destination addresses."

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::pool::PoolSlot;

use super::fec::FecHeader;
use super::rtcp::RtcpPacket;
use super::rtp::RtpHeader;

/// What a packet is and how far along its lifecycle it is. A plain
/// struct of booleans rather than a bitmask: the set is small and fixed
/// and every flag is checked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFlags {
    pub prepared: bool,
    pub composed: bool,
    pub udp: bool,
    pub audio: bool,
    pub control: bool,
    pub repair: bool,
}

/// A packet's backing bytes: either a plain heap buffer (the common case
/// for test/internally-built packets) or a slot checked out of a `Pool`
/// (the hot ingest path — see `netio::endpoint::Endpoint`). `Arc`-wrapped
/// either way so cloning a `Packet` (e.g. to feed both a session and its
/// FEC reader) never copies the payload, per spec.md line 285's
/// ownership note: shared ownership via atomic ref count for
/// cross-thread-held packets/frames.
#[derive(Clone)]
enum PacketBuf {
    Owned(Arc<Vec<u8>>),
    Pooled { slot: Arc<PoolSlot>, len: usize },
}

impl PacketBuf {
    fn bytes(&self) -> &[u8] {
        match self {
            PacketBuf::Owned(v) => v,
            PacketBuf::Pooled { slot, len } => &slot.bytes()[..*len],
        }
    }
}

/// Raw bytes plus whatever headers have been parsed out of them so far.
#[derive(Clone)]
pub struct Packet {
    buffer: PacketBuf,
    pub flags: PacketFlags,
    pub rtp: Option<RtpHeader>,
    pub fec: Option<FecHeader>,
    pub rtcp: Option<RtcpPacket>,
    pub src_addr: Option<SocketAddr>,
    pub dst_addr: Option<SocketAddr>,
}

impl Packet {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self {
            buffer: PacketBuf::Owned(Arc::new(buffer)),
            flags: PacketFlags::default(),
            rtp: None,
            fec: None,
            rtcp: None,
            src_addr: None,
            dst_addr: None,
        }
    }

    /// Builds a packet whose bytes live in a pool slot (the `len` first
    /// bytes of it; the rest of the slot is leftover slab capacity).
    pub fn from_pool(slot: PoolSlot, len: usize) -> Self {
        Self {
            buffer: PacketBuf::Pooled { slot: Arc::new(slot), len },
            flags: PacketFlags::default(),
            rtp: None,
            fec: None,
            rtcp: None,
            src_addr: None,
            dst_addr: None,
        }
    }

    pub fn with_source(mut self, addr: SocketAddr) -> Self {
        self.src_addr = Some(addr);
        self.flags.udp = true;
        self
    }

    /// The packet's raw bytes, regardless of whether they're pool- or
    /// heap-backed.
    pub fn bytes(&self) -> &[u8] {
        self.buffer.bytes()
    }

    pub fn payload(&self) -> &[u8] {
        match &self.rtp {
            Some(h) => &self.bytes()[h.header_len()..],
            None => self.bytes(),
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("len", &self.bytes().len())
            .field("flags", &self.flags)
            .field("rtp", &self.rtp)
            .field("fec", &self.fec)
            .field("rtcp", &self.rtcp)
            .field("src_addr", &self.src_addr)
            .field("dst_addr", &self.dst_addr)
            .finish()
    }
}
