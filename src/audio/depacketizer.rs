//! Converts RTP payload bytes into `Frame`s, tracking sequence-number
//! continuity so missing packets emit a gap-flagged silence frame
//! instead of skipping ahead (spec.md §4.G "Depacketizer").
//!
//! PCM decode is grounded on `bass-aes67::input::rtp::convert_24bit_be_to_float`
//! (24-bit big-endian linear PCM, the AES67 wire format); 16/32-bit
//! decode follows the same normalization pattern.

use super::frame::{Frame, FrameFlags};
use super::sample_spec::{SampleFormat, SampleSpec};
use crate::packet::packet::Packet;
use crate::packet::rtp::sequence_diff;

/// `convert_24bit_be_to_float`'s normalization constant: `1 / 2^23`.
const NORMALIZE_24: f32 = 0.000_000_119_209_29;

fn decode_pcm(payload: &[u8], format: SampleFormat, num_channels: usize) -> Vec<f32> {
    let bytes_per = format.bytes_per_sample();
    if bytes_per == 0 || num_channels == 0 {
        return Vec::new();
    }
    let n_samples = payload.len() / bytes_per;
    let mut out = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let b = &payload[i * bytes_per..(i + 1) * bytes_per];
        let v = match format {
            SampleFormat::I16 => i16::from_be_bytes([b[0], b[1]]) as f32 / i16::MAX as f32,
            SampleFormat::I24 => {
                let raw = ((b[0] as i32) << 16) | ((b[1] as i32) << 8) | (b[2] as i32);
                let signed = (raw << 8) >> 8; // sign-extend 24 -> 32
                signed as f32 * NORMALIZE_24
            }
            SampleFormat::I32 => i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f32 / i32::MAX as f32,
            SampleFormat::F32 => f32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        };
        out.push(v);
    }
    out
}

/// Stateful depacketizer for one session: remembers the last sequence
/// number and RTP timestamp seen so it can detect gaps between calls.
pub struct Depacketizer {
    spec: SampleSpec,
    last_seq: Option<u16>,
    samples_per_packet: u64,
}

impl Depacketizer {
    pub fn new(spec: SampleSpec, samples_per_packet: u64) -> Self {
        Self { spec, last_seq: None, samples_per_packet }
    }

    /// Decode one RTP packet's payload, returning the original frame and
    /// — if packets were skipped since the last call — a preceding gap
    /// frame sized to cover the missing span.
    pub fn depacketize(&mut self, packet: &Packet, capture_ts_ns: u64) -> (Option<Frame>, Frame) {
        let num_channels = self.spec.num_channels().max(1);
        let seq = packet.rtp.map(|h| h.sequence_number);

        let gap_frame = match (self.last_seq, seq) {
            (Some(last), Some(cur)) if sequence_diff(cur, last) > 1 => {
                let missing = (sequence_diff(cur, last) - 1) as u64;
                let gap_samples = (missing * self.samples_per_packet) as usize;
                Some(Frame::new(
                    vec![0.0; gap_samples * num_channels],
                    num_channels,
                    capture_ts_ns,
                    FrameFlags::Silence,
                ))
            }
            _ => None,
        };

        if let Some(s) = seq {
            self.last_seq = Some(s);
        }

        let payload = packet.payload();
        let trimmed = match &packet.rtp {
            Some(h) if h.padding_len() > 0 && h.padding_len() <= payload.len() => {
                &payload[..payload.len() - h.padding_len()]
            }
            _ => payload,
        };
        let samples = decode_pcm(trimmed, self.spec.format, num_channels);
        let frame = Frame::new(samples, num_channels, capture_ts_ns, FrameFlags::Original);

        (gap_frame, frame)
    }
}
