//! Inserts packets by RTP sequence number with wraparound-aware
//! ordering; duplicates discarded; capacity bounded (spec.md §4.G
//! "Sorted queue").
//!
//! Ported from `bass-aes67::input::jitter::JitterBuffer`'s
//! `find_insert_position` binary search over `sequence_diff`.

use std::collections::VecDeque;

use crate::packet::packet::Packet;
use crate::packet::rtp::sequence_diff;

pub struct SortedQueue {
    capacity: usize,
    packets: VecDeque<Packet>,
}

impl SortedQueue {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), packets: VecDeque::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    fn seq_of(packet: &Packet) -> Option<u16> {
        packet.rtp.map(|h| h.sequence_number)
    }

    /// Binary-search for the position to insert `seq` so the queue stays
    /// ordered by wraparound-aware sequence number.
    fn find_insert_position(&self, seq: u16) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = self.packets.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let mid_seq = Self::seq_of(&self.packets[mid])?;
            match sequence_diff(seq, mid_seq) {
                0 => return None, // duplicate
                d if d < 0 => hi = mid,
                _ => lo = mid + 1,
            }
        }
        Some(lo)
    }

    /// Insert `packet`, dropping it silently if it duplicates a
    /// sequence number already queued, or if the queue is at capacity
    /// (oldest-first eviction does not happen here — a full queue means
    /// the delayed reader isn't draining fast enough, which is the
    /// watchdog's concern, not this queue's).
    pub fn push(&mut self, packet: Packet) -> bool {
        let Some(seq) = Self::seq_of(&packet) else {
            return false;
        };
        if self.packets.len() >= self.capacity {
            return false;
        }
        match self.find_insert_position(seq) {
            Some(pos) => {
                self.packets.insert(pos, packet);
                true
            }
            None => false, // duplicate
        }
    }

    pub fn peek(&self) -> Option<&Packet> {
        self.packets.front()
    }

    pub fn pop(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_seq(seq: u16) -> Packet {
        let mut buf = vec![0u8; 12];
        buf[2..4].copy_from_slice(&seq.to_be_bytes());
        let mut p = Packet::new(buf.clone());
        p.rtp = Some(crate::packet::rtp::parse_rtp_header(&buf).unwrap());
        p
    }

    #[test]
    fn out_of_order_packets_come_out_sorted() {
        let mut q = SortedQueue::new(10);
        q.push(packet_with_seq(3));
        q.push(packet_with_seq(1));
        q.push(packet_with_seq(2));

        assert_eq!(q.pop().unwrap().rtp.unwrap().sequence_number, 1);
        assert_eq!(q.pop().unwrap().rtp.unwrap().sequence_number, 2);
        assert_eq!(q.pop().unwrap().rtp.unwrap().sequence_number, 3);
    }

    #[test]
    fn duplicate_sequence_is_rejected() {
        let mut q = SortedQueue::new(10);
        assert!(q.push(packet_with_seq(5)));
        assert!(!q.push(packet_with_seq(5)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn ordering_survives_sequence_wraparound() {
        let mut q = SortedQueue::new(10);
        q.push(packet_with_seq(65534));
        q.push(packet_with_seq(1));
        q.push(packet_with_seq(65535));
        assert_eq!(q.pop().unwrap().rtp.unwrap().sequence_number, 65534);
        assert_eq!(q.pop().unwrap().rtp.unwrap().sequence_number, 65535);
        assert_eq!(q.pop().unwrap().rtp.unwrap().sequence_number, 1);
    }

    #[test]
    fn full_queue_rejects_new_packets() {
        let mut q = SortedQueue::new(2);
        assert!(q.push(packet_with_seq(1)));
        assert!(q.push(packet_with_seq(2)));
        assert!(!q.push(packet_with_seq(3)));
    }
}
