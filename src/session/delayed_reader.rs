//! Enforces a target latency by holding packets in the sorted queue
//! until backlog reaches the target, smoothing jitter (spec.md §4.G
//! "Delayed reader").

use super::sorted_queue::SortedQueue;
use crate::packet::packet::Packet;

pub struct DelayedReader {
    target_packets: usize,
    buffering: bool,
}

impl DelayedReader {
    pub fn new(target_packets: usize) -> Self {
        Self { target_packets: target_packets.max(1), buffering: true }
    }

    /// Backlog deficit: positive means the queue hasn't reached target
    /// yet (reported to the latency monitor for its PI loop).
    pub fn backlog_deficit(&self, queue: &SortedQueue) -> i64 {
        self.target_packets as i64 - queue.len() as i64
    }

    /// Pop the next packet if the queue has reached (or, once primed,
    /// stays above) the target backlog. Returns `None` while still
    /// buffering up to target — this is the "hold packets until backlog
    /// >= target" behavior, not a per-call failure.
    pub fn read(&mut self, queue: &mut SortedQueue) -> Option<Packet> {
        if self.buffering {
            if queue.len() < self.target_packets {
                return None;
            }
            self.buffering = false;
        }
        let packet = queue.pop();
        if queue.is_empty() {
            // Ran dry: re-enter buffering so a burst doesn't get drained
            // one at a time the instant it partially arrives.
            self.buffering = true;
        }
        packet
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
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
    fn holds_packets_until_target_backlog_reached() {
        let mut reader = DelayedReader::new(3);
        let mut queue = SortedQueue::new(10);
        queue.push(packet_with_seq(1));
        assert!(reader.read(&mut queue).is_none());
        queue.push(packet_with_seq(2));
        queue.push(packet_with_seq(3));
        assert!(reader.read(&mut queue).is_some());
    }

    #[test]
    fn backlog_deficit_reports_positive_while_buffering() {
        let reader = DelayedReader::new(5);
        let mut queue = SortedQueue::new(10);
        queue.push(packet_with_seq(1));
        assert_eq!(reader.backlog_deficit(&queue), 4);
    }
}
