//! End-to-end scenarios wiring router, session, session group, and
//! mixer together, mirroring real sender/receiver traffic patterns.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::audio::channel_set::{ChannelLayout, ChannelOrder, ChannelSet};
use crate::audio::sample_spec::{SampleFormat, SampleSpec};
use crate::config::SessionDefaults;
use crate::packet::packet::Packet;
use crate::packet::parser::{PacketParser, RtcpParser};
use crate::session::group::{NullFecCodec, SessionGroup};

const SAMPLES_PER_PACKET: u64 = 480; // 10ms @ 48kHz

fn stereo_spec() -> SampleSpec {
    let cs = ChannelSet::from_mask(ChannelLayout::Surround, ChannelOrder::Smpte, 0b11);
    SampleSpec::new(48_000, SampleFormat::I16, cs)
}

fn sender_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), port)
}

fn audio_packet(seq: u16, ts: u32, ssrc: u32, port: u16) -> Packet {
    let payload_samples = (SAMPLES_PER_PACKET * 2) as usize; // stereo
    let mut buf = vec![0u8; 12 + payload_samples * 2];
    buf[0] = 0x80;
    buf[1] = 96;
    buf[2..4].copy_from_slice(&seq.to_be_bytes());
    buf[4..8].copy_from_slice(&ts.to_be_bytes());
    buf[8..12].copy_from_slice(&ssrc.to_be_bytes());
    // fill with a non-zero constant so frames are not all-silence
    for i in 12..buf.len() {
        buf[i] = 0x10;
    }
    let mut p = Packet::new(buf);
    p.rtp = Some(crate::packet::rtp::parse_rtp_header(p.bytes()).unwrap());
    p.flags.audio = true;
    p.flags.udp = true;
    p.src_addr = Some(sender_addr(port));
    p
}

fn fast_defaults() -> SessionDefaults {
    SessionDefaults {
        target_latency: Duration::from_millis(30), // 3 packets of backlog
        no_playback_timeout: Duration::from_millis(100),
        silence_timeout: Duration::from_secs(5),
        gap_timeout: Duration::from_secs(5),
        plc_horizon: Duration::from_millis(80),
        max_seq_gap: 100,
        resampler_max_trim_ppm: 20.0,
        sorted_queue_capacity: 256,
        fec_block_window: 4,
    }
}

fn new_group() -> SessionGroup {
    SessionGroup::new(stereo_spec(), SAMPLES_PER_PACKET, fast_defaults(), Vec::new())
}

/// Builds a real wire-format RTCP SDES packet (SSRC + CNAME item) and
/// runs it through the same parser an `Endpoint` would, so tests exercise
/// the actual bytes-in entry point rather than calling `ReceiverHooks`
/// methods directly.
fn rtcp_sdes_packet(ssrc: u32, cname: &str) -> Packet {
    let cname = cname.as_bytes();
    let mut body = vec![0u8; 4 + 2 + cname.len()];
    body[0..4].copy_from_slice(&ssrc.to_be_bytes());
    body[4] = 1; // CNAME item type
    body[5] = cname.len() as u8;
    body[6..6 + cname.len()].copy_from_slice(cname);
    let padded_len = ((body.len() + 3) / 4) * 4;
    body.resize(padded_len, 0);

    let mut buf = vec![0u8; 4 + body.len()];
    buf[0] = 0x81; // version 2, source count 1
    buf[1] = 202; // SDES payload type
    buf[2..4].copy_from_slice(((body.len() / 4) as u16).to_be_bytes().as_ref());
    buf[4..].copy_from_slice(&body);

    let mut packet = Packet::new(buf);
    RtcpParser.parse(&mut packet).expect("well-formed sdes packet parses");
    packet
}

/// Scenario A: single SSRC stereo PCM, no loss. One session appears and
/// keeps producing non-silence frames with strictly increasing capture
/// timestamps.
#[test]
fn single_ssrc_stereo_produces_one_growing_session() {
    let mut group = new_group();
    let mut now_ns = 0u64;
    let mut last_ts = None;

    for seq in 1000u16..1100 {
        let ts = (seq as u32).wrapping_sub(1000) * SAMPLES_PER_PACKET as u32;
        group.handle_packet(audio_packet(seq, ts, 0x1234_5678, 5004));
        assert_eq!(group.num_sessions(), 1);

        for frame in group.read_all(now_ns) {
            if let Some(prev) = last_ts {
                assert!(frame.capture_ts_ns >= prev);
            }
            last_ts = Some(frame.capture_ts_ns);
            assert!(frame.samples().iter().any(|&s| s != 0.0));
        }
        now_ns += 10_000_000;
    }

    assert_eq!(group.num_sessions(), 1);
}

/// Scenario B: packet #51 arrives before #50. The sorted queue reorders
/// them so depacketization still proceeds without a gap.
#[test]
fn late_packet_is_reordered_not_dropped() {
    let mut group = new_group();
    let mut now_ns = 0u64;

    for seq in 1000u16..1050 {
        let ts = (seq as u32).wrapping_sub(1000) * SAMPLES_PER_PACKET as u32;
        group.handle_packet(audio_packet(seq, ts, 0x1234_5678, 5004));
        group.read_all(now_ns);
        now_ns += 10_000_000;
    }

    // #51 arrives first, then the late #50.
    group.handle_packet(audio_packet(1051, 51 * SAMPLES_PER_PACKET as u32, 0x1234_5678, 5004));
    group.handle_packet(audio_packet(1050, 50 * SAMPLES_PER_PACKET as u32, 0x1234_5678, 5004));

    for seq in 1052u16..1150 {
        let ts = (seq as u32).wrapping_sub(1000) * SAMPLES_PER_PACKET as u32;
        group.handle_packet(audio_packet(seq, ts, 0x1234_5678, 5004));
    }

    let mut any_frame = false;
    for _ in 0..200 {
        if !group.read_all(now_ns).is_empty() {
            any_frame = true;
        }
        now_ns += 10_000_000;
    }
    assert!(any_frame, "reordered stream should still drain into frames");
}

/// Scenario D: two SSRCs sending into one slot get two sessions; once
/// one is removed (via `refresh_sessions` after it goes silent and its
/// watchdog trips) only the other remains.
#[test]
fn two_distinct_ssrcs_get_two_sessions_then_one_is_dropped() {
    let mut group = new_group();
    let mut now_ns = 0u64;

    for seq in 0u16..20 {
        let ts = seq as u32 * SAMPLES_PER_PACKET as u32;
        group.handle_packet(audio_packet(1000 + seq, ts, 0xAAAA, 5004));
        group.handle_packet(audio_packet(2000 + seq, ts, 0xBBBB, 5006));
        group.read_all(now_ns);
        now_ns += 10_000_000;
    }
    assert_eq!(group.num_sessions(), 2);

    // 0xAAAA stops sending; let its watchdog's no_playback_timeout trip.
    now_ns += 200_000_000;
    group.read_all(now_ns);
    group.refresh_sessions(now_ns);

    assert_eq!(group.num_sessions(), 1);
}

/// Scenario F: a sender that goes silent for longer than
/// `no_playback_timeout` has its session torn down on the next
/// `refresh_sessions`, and the group reports zero sessions afterward.
#[test]
fn watchdog_terminates_silent_session() {
    let mut group = new_group();
    let mut now_ns = 0u64;

    for seq in 0u16..10 {
        let ts = seq as u32 * SAMPLES_PER_PACKET as u32;
        group.handle_packet(audio_packet(1000 + seq, ts, 0x1234_5678, 5004));
        group.read_all(now_ns);
        now_ns += 10_000_000;
    }
    assert_eq!(group.num_sessions(), 1);

    now_ns += 500_000_000; // well past no_playback_timeout
    group.read_all(now_ns);
    group.refresh_sessions(now_ns);

    assert_eq!(group.num_sessions(), 0);
}

/// RTCP SDES CNAME linking: a repair SSRC is correlated to an audio
/// session's route once both are reported under the same CNAME, without
/// needing a second `handle_packet` to create a second session.
#[test]
fn rtcp_cname_links_repair_ssrc_to_existing_session() {
    use crate::session::group::ReceiverHooks;

    let mut group = new_group();
    group.handle_packet(audio_packet(1000, 0, 1, 5004));
    assert_eq!(group.num_sessions(), 1);

    group.on_update_source(1, "alice");
    group.on_update_source(2, "alice");

    // The audio ssrc still resolves to the lone session; the repair ssrc
    // never spawned one of its own.
    assert_eq!(group.num_sessions(), 1);

    let metrics = group.on_get_reception_metrics(1).expect("session still routes ssrc 1");
    assert_eq!(metrics.cname.as_deref(), Some("alice"));
}

/// Same correlation as above, but driven entirely through
/// `handle_packet` with real RTCP wire bytes, proving the dispatch path
/// from a parsed `packet.rtcp` into `ReceiverHooks` actually exists.
#[test]
fn rtcp_sdes_over_the_wire_links_repair_ssrc_to_existing_session() {
    let mut group = new_group();
    group.handle_packet(audio_packet(1000, 0, 1, 5004));
    assert_eq!(group.num_sessions(), 1);

    group.handle_packet(rtcp_sdes_packet(1, "alice"));
    group.handle_packet(rtcp_sdes_packet(2, "alice"));

    // The audio ssrc still resolves to the lone session; the repair ssrc
    // was linked by a real wire-format SDES packet and still never
    // spawned a session of its own.
    assert_eq!(group.num_sessions(), 1);
}

#[test]
fn null_fec_codec_never_reconstructs() {
    use crate::session::fec_reader::FecCodec;
    let codec = NullFecCodec;
    let block = crate::session::fec_reader::Block::default();
    assert!(codec.reconstruct(&block, 0).is_none());
}

#[test]
fn repair_only_traffic_never_creates_a_session() {
    let mut group = new_group();
    let mut p = audio_packet(1, 0, 0x9999, 5006);
    p.flags.repair = true;
    group.handle_packet(p);
    assert_eq!(group.num_sessions(), 0);
}
