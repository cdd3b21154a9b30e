//! RTP/RTCP/FEC packet types and a chainable parser (spec.md §3, §4.D).

pub mod fec;
pub mod packet;
pub mod parser;
pub mod rtcp;
pub mod rtp;

pub use packet::{Packet, PacketFlags};
pub use parser::PacketParser;
