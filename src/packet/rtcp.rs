//! RTCP parsing: Sender Report, Receiver Report, SDES, BYE (spec.md §4.D).
//!
//! Wire layout grounded on the RTCP sender-report diagram in
//! `examples/other_examples/f2e91c7e_webrtc-rs-webrtc__crates-rtcp-src-sender_report-mod.rs.rs`
//! (SSRC, NTP timestamp hi/lo, RTP timestamp, packet/octet counts,
//! reception report blocks); SDES/BYE layouts are the RFC 3550 §6.5/§6.6
//! minimal forms needed to drive `Session Group`'s `on_update_source`/
//! `on_remove_source` hooks (spec.md §4.H).

use crate::error::Status;

const RTCP_VERSION: u8 = 2;
const PT_SR: u8 = 200;
const PT_RR: u8 = 201;
const PT_SDES: u8 = 202;
const PT_BYE: u8 = 203;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportBlock {
    pub ssrc: u32,
    pub fraction_lost: u8,
    pub cumulative_lost: u32,
    pub highest_seq: u32,
    pub jitter: u32,
    pub last_sr: u32,
    pub delay_since_last_sr: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SenderReport {
    pub ssrc: u32,
    pub ntp_sec: u32,
    pub ntp_frac: u32,
    pub rtp_timestamp: u32,
    pub packet_count: u32,
    pub octet_count: u32,
    pub reports: Vec<ReportBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverReport {
    pub ssrc: u32,
    pub reports: Vec<ReportBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescription {
    pub ssrc: u32,
    pub cname: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bye {
    pub sources: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RtcpPacket {
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    SourceDescription(SourceDescription),
    Bye(Bye),
}

fn parse_report_blocks(buf: &[u8], count: u8) -> Result<Vec<ReportBlock>, Status> {
    let mut blocks = Vec::with_capacity(count as usize);
    let mut off = 0usize;
    for _ in 0..count {
        if buf.len() < off + 24 {
            return Err(Status::BadPacket("rtcp report block truncated"));
        }
        let b = &buf[off..off + 24];
        blocks.push(ReportBlock {
            ssrc: u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            fraction_lost: b[4],
            cumulative_lost: u32::from_be_bytes([0, b[5], b[6], b[7]]),
            highest_seq: u32::from_be_bytes([b[8], b[9], b[10], b[11]]),
            jitter: u32::from_be_bytes([b[12], b[13], b[14], b[15]]),
            last_sr: u32::from_be_bytes([b[16], b[17], b[18], b[19]]),
            delay_since_last_sr: u32::from_be_bytes([b[20], b[21], b[22], b[23]]),
        });
        off += 24;
    }
    Ok(blocks)
}

/// Parse one RTCP packet (a compound packet's first entry; callers loop
/// over `header_len` to walk the rest). Unknown payload types are
/// absorbed, per spec.md §4.D.
pub fn parse_rtcp_packet(buf: &[u8]) -> Result<(RtcpPacket, usize), Status> {
    if buf.len() < 8 {
        return Err(Status::BadPacket("rtcp header shorter than 8 bytes"));
    }
    let b0 = buf[0];
    let version = (b0 >> 6) & 0x03;
    if version != RTCP_VERSION {
        return Err(Status::BadPacket("unsupported rtcp version"));
    }
    let count = b0 & 0x1F;
    let packet_type = buf[1];
    let length_words = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    let total_len = (length_words + 1) * 4;
    if buf.len() < total_len {
        return Err(Status::BadPacket("rtcp packet truncated"));
    }
    let body = &buf[4..total_len];

    match packet_type {
        PT_SR => {
            if body.len() < 20 {
                return Err(Status::BadPacket("rtcp sr truncated"));
            }
            let ssrc = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            let ntp_sec = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
            let ntp_frac = u32::from_be_bytes([body[8], body[9], body[10], body[11]]);
            let rtp_timestamp = u32::from_be_bytes([body[12], body[13], body[14], body[15]]);
            let packet_count = u32::from_be_bytes([body[16], body[17], body[18], body[19]]);
            let octet_count = if body.len() >= 24 {
                u32::from_be_bytes([body[20], body[21], body[22], body[23]])
            } else {
                0
            };
            let reports = parse_report_blocks(&body[24.min(body.len())..], count)?;
            Ok((
                RtcpPacket::SenderReport(SenderReport {
                    ssrc,
                    ntp_sec,
                    ntp_frac,
                    rtp_timestamp,
                    packet_count,
                    octet_count,
                    reports,
                }),
                total_len,
            ))
        }
        PT_RR => {
            if body.len() < 4 {
                return Err(Status::BadPacket("rtcp rr truncated"));
            }
            let ssrc = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            let reports = parse_report_blocks(&body[4..], count)?;
            Ok((RtcpPacket::ReceiverReport(ReceiverReport { ssrc, reports }), total_len))
        }
        PT_SDES => {
            if body.len() < 4 {
                return Err(Status::BadPacket("rtcp sdes truncated"));
            }
            let ssrc = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            let mut cname = None;
            let mut off = 4;
            while off + 1 < body.len() {
                let item_type = body[off];
                if item_type == 0 {
                    break; // end of item list
                }
                let item_len = body[off + 1] as usize;
                if off + 2 + item_len > body.len() {
                    break;
                }
                if item_type == 1 {
                    // CNAME
                    cname = std::str::from_utf8(&body[off + 2..off + 2 + item_len])
                        .ok()
                        .map(|s| s.to_string());
                }
                off += 2 + item_len;
            }
            Ok((RtcpPacket::SourceDescription(SourceDescription { ssrc, cname }), total_len))
        }
        PT_BYE => {
            let mut sources = Vec::with_capacity(count as usize);
            let mut off = 0usize;
            for _ in 0..count {
                if body.len() < off + 4 {
                    break;
                }
                sources.push(u32::from_be_bytes([body[off], body[off + 1], body[off + 2], body[off + 3]]));
                off += 4;
            }
            Ok((RtcpPacket::Bye(Bye { sources }), total_len))
        }
        _ => Err(Status::BadPacket("unsupported rtcp payload type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sender_report_with_no_blocks() {
        let mut buf = vec![0u8; 28];
        buf[0] = 0x80; // version 2, count 0
        buf[1] = PT_SR;
        buf[2..4].copy_from_slice(&6u16.to_be_bytes()); // length words = 6 -> 28 bytes
        buf[4..8].copy_from_slice(&0x1122_3344u32.to_be_bytes());
        let (pkt, len) = parse_rtcp_packet(&buf).unwrap();
        assert_eq!(len, 28);
        match pkt {
            RtcpPacket::SenderReport(sr) => assert_eq!(sr.ssrc, 0x1122_3344),
            _ => panic!("expected sender report"),
        }
    }

    #[test]
    fn parses_bye_with_one_source() {
        let mut buf = vec![0u8; 8];
        buf[0] = 0x81; // count 1
        buf[1] = PT_BYE;
        buf[2..4].copy_from_slice(&1u16.to_be_bytes());
        buf[4..8].copy_from_slice(&99u32.to_be_bytes());
        let (pkt, _) = parse_rtcp_packet(&buf).unwrap();
        match pkt {
            RtcpPacket::Bye(b) => assert_eq!(b.sources, vec![99]),
            _ => panic!("expected bye"),
        }
    }

    #[test]
    fn parses_sdes_cname() {
        let cname = b"session@host";
        let mut body = vec![0u8; 4 + 2 + cname.len()];
        body[0..4].copy_from_slice(&7u32.to_be_bytes());
        body[4] = 1; // CNAME item type
        body[5] = cname.len() as u8;
        body[6..6 + cname.len()].copy_from_slice(cname);
        let padded_len = ((body.len() + 3) / 4) * 4;
        body.resize(padded_len, 0);

        let mut buf = vec![0u8; 4 + body.len()];
        buf[0] = 0x81;
        buf[1] = PT_SDES;
        buf[2..4].copy_from_slice((((body.len()) / 4) as u16).to_be_bytes().as_ref());
        buf[4..].copy_from_slice(&body);

        let (pkt, _) = parse_rtcp_packet(&buf).unwrap();
        match pkt {
            RtcpPacket::SourceDescription(sd) => {
                assert_eq!(sd.ssrc, 7);
                assert_eq!(sd.cname.as_deref(), Some("session@host"));
            }
            _ => panic!("expected sdes"),
        }
    }
}
