//! Enforces per-session protocol invariants before packets reach the
//! depacketizer (spec.md §4.G "Validator").
//!
//! Grounded on the gap/sequence checks already present in
//! `bass-aes67::input::jitter::JitterBuffer` and `rtp::sequence_diff`,
//! generalized into a standalone gate: timestamp monotonicity, payload
//! type stability, and bounded sequence gaps. A gross violation
//! recommends session termination rather than trying to self-heal —
//! the watchdog then tears the session down.

use crate::config::EncodingMap;
use crate::packet::packet::Packet;
use crate::packet::rtp::sequence_diff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accept,
    /// Dropped locally; not fatal (e.g. a single stale/duplicate packet).
    Reject,
    /// Gross protocol violation; caller should terminate the session.
    Fatal,
}

pub struct ValidatorConfig {
    /// Fixed expected payload type, or `None` to lock onto whatever the
    /// first accepted packet carries.
    pub expected_payload_type: Option<u8>,
    pub max_seq_gap: i32,
    pub expected_sample_rate: u32,
    /// Payload-type -> sample-spec registry used to catch a sender
    /// whose declared encoding doesn't match this receiver's output
    /// rate, even though its payload type never changes mid-stream.
    pub encoding_map: EncodingMap,
}

pub struct Validator {
    cfg: ValidatorConfig,
    locked_payload_type: Option<u8>,
    last_timestamp: Option<u32>,
    last_seq: Option<u16>,
}

impl Validator {
    pub fn new(cfg: ValidatorConfig) -> Self {
        let locked_payload_type = cfg.expected_payload_type;
        Self { cfg, locked_payload_type, last_timestamp: None, last_seq: None }
    }

    pub fn validate(&mut self, packet: &Packet) -> ValidationOutcome {
        let Some(header) = &packet.rtp else {
            return ValidationOutcome::Reject;
        };

        match self.locked_payload_type {
            Some(expected) if header.payload_type != expected => {
                // Payload type changing mid-stream means the sender
                // switched codecs without renegotiating; not recoverable.
                return ValidationOutcome::Fatal;
            }
            Some(_) => {}
            None => {
                self.locked_payload_type = Some(header.payload_type);
                if let Some(entry) = self.cfg.encoding_map.entries.get(&header.payload_type) {
                    if !self.sample_rate_matches(entry.sample_rate) {
                        return ValidationOutcome::Fatal;
                    }
                }
            }
        }

        if let Some(last_seq) = self.last_seq {
            let diff = sequence_diff(header.sequence_number, last_seq);
            if diff <= 0 {
                return ValidationOutcome::Reject; // duplicate or reordered-too-far
            }
            if diff > self.cfg.max_seq_gap {
                return ValidationOutcome::Fatal;
            }
        }

        if let Some(last_ts) = self.last_timestamp {
            // RTP timestamps may wrap, but must never move backwards
            // relative to the immediately preceding in-order packet.
            if header.timestamp < last_ts && last_ts - header.timestamp < u32::MAX / 2 {
                return ValidationOutcome::Fatal;
            }
        }

        self.last_seq = Some(header.sequence_number);
        self.last_timestamp = Some(header.timestamp);
        ValidationOutcome::Accept
    }

    pub fn sample_rate_matches(&self, rate: u32) -> bool {
        rate == self.cfg.expected_sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with(seq: u16, ts: u32, pt: u8) -> Packet {
        let mut buf = vec![0u8; 12];
        buf[1] = pt;
        buf[2..4].copy_from_slice(&seq.to_be_bytes());
        buf[4..8].copy_from_slice(&ts.to_be_bytes());
        let mut p = Packet::new(buf.clone());
        p.rtp = Some(crate::packet::rtp::parse_rtp_header(&buf).unwrap());
        p
    }

    fn cfg() -> ValidatorConfig {
        ValidatorConfig {
            expected_payload_type: Some(96),
            max_seq_gap: 50,
            expected_sample_rate: 48_000,
            encoding_map: EncodingMap::default(),
        }
    }

    #[test]
    fn accepts_in_order_stream() {
        let mut v = Validator::new(cfg());
        assert_eq!(v.validate(&packet_with(1, 100, 96)), ValidationOutcome::Accept);
        assert_eq!(v.validate(&packet_with(2, 200, 96)), ValidationOutcome::Accept);
    }

    #[test]
    fn rejects_duplicate_sequence() {
        let mut v = Validator::new(cfg());
        v.validate(&packet_with(5, 100, 96));
        assert_eq!(v.validate(&packet_with(5, 200, 96)), ValidationOutcome::Reject);
    }

    #[test]
    fn payload_type_change_is_fatal() {
        let mut v = Validator::new(cfg());
        v.validate(&packet_with(1, 100, 96));
        assert_eq!(v.validate(&packet_with(2, 200, 97)), ValidationOutcome::Fatal);
    }

    #[test]
    fn huge_sequence_jump_is_fatal() {
        let mut v = Validator::new(cfg());
        v.validate(&packet_with(1, 100, 96));
        assert_eq!(v.validate(&packet_with(1000, 200, 96)), ValidationOutcome::Fatal);
    }

    #[test]
    fn locks_onto_first_packets_payload_type_when_unconfigured() {
        let mut v = Validator::new(ValidatorConfig {
            expected_payload_type: None,
            max_seq_gap: 50,
            expected_sample_rate: 48_000,
            encoding_map: EncodingMap::default(),
        });
        assert_eq!(v.validate(&packet_with(1, 100, 97)), ValidationOutcome::Accept);
        assert_eq!(v.validate(&packet_with(2, 200, 96)), ValidationOutcome::Fatal);
    }

    #[test]
    fn encoding_map_mismatch_against_expected_rate_is_fatal() {
        let mut map = EncodingMap::default();
        map.entries.get_mut(&96).unwrap().sample_rate = 44_100;
        let mut v = Validator::new(ValidatorConfig {
            expected_payload_type: None,
            max_seq_gap: 50,
            expected_sample_rate: 48_000,
            encoding_map: map,
        });
        assert_eq!(v.validate(&packet_with(1, 100, 96)), ValidationOutcome::Fatal);
    }
}
