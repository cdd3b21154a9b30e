//! Accumulates source + repair packets into FEC blocks and reconstructs
//! missing source packets once enough shards have arrived (spec.md
//! §4.G "FEC reader"). Bounded block memory; stale blocks are evicted.
//!
//! Only block bookkeeping is in scope: the actual RS8M/LDPC shard math
//! is an external collaborator (spec.md §1 Non-goals). `try_reconstruct`
//! is a pluggable hook so that codec can be wired in without this
//! module knowing its internals.

use std::collections::BTreeMap;

use crate::packet::fec::{FecHeader, SourceFooter};
use crate::packet::packet::Packet;
use crate::packet::rtp::parse_rtp_header;

/// Reconstructs a missing source shard's payload from the surviving
/// shards of its block. The real implementation is RS8M/LDPC math,
/// outside this crate's scope.
pub trait FecCodec: Send {
    fn reconstruct(&self, block: &FecBlock, missing_shard: u16) -> Option<Vec<u8>>;
}

#[derive(Default)]
pub struct Block {
    pub source_shards: BTreeMap<u16, Packet>,
    pub repair_shards: BTreeMap<u16, Packet>,
    pub source_block_len: Option<u16>,
    pub repair_block_len: Option<u16>,
}

pub type FecBlock = Block;

impl Block {
    fn total_shards(&self) -> Option<u16> {
        match (self.source_block_len, self.repair_block_len) {
            (Some(s), Some(r)) => Some(s + r),
            _ => None,
        }
    }

    fn received_shards(&self) -> usize {
        self.source_shards.len() + self.repair_shards.len()
    }

    /// A block is recoverable once received shards meet the source
    /// count (Reed-Solomon/LDPC-Staircase both recover from any subset
    /// of shards whose size equals the source block length).
    fn is_recoverable(&self) -> bool {
        match self.source_block_len {
            Some(n) => self.received_shards() >= n as usize,
            None => false,
        }
    }
}

pub struct FecReader {
    codec: Box<dyn FecCodec>,
    blocks: BTreeMap<u32, Block>,
    max_blocks: usize,
}

impl FecReader {
    pub fn new(codec: Box<dyn FecCodec>, max_blocks: usize) -> Self {
        Self { codec, blocks: BTreeMap::new(), max_blocks: max_blocks.max(1) }
    }

    fn evict_stale(&mut self) {
        while self.blocks.len() > self.max_blocks {
            if let Some((&oldest, _)) = self.blocks.iter().next() {
                self.blocks.remove(&oldest);
            }
        }
    }

    /// Feed one packet (source or repair) into its block. Returns fully
    /// reconstructed source packets, ready to rejoin the session's
    /// `source_queue` like any packet that arrived over the wire — a
    /// recovered shard that fails to parse as a valid RTP header is
    /// logged and dropped rather than handed upstream.
    pub fn push(&mut self, packet: Packet) -> Vec<Packet> {
        let Some(fec) = packet.fec else {
            return Vec::new();
        };

        let block_num = match fec {
            FecHeader::Source(f) => f.block_num,
            FecHeader::Repair(h) => h.block_num,
        };

        let block = self.blocks.entry(block_num).or_default();
        match fec {
            FecHeader::Source(f) => {
                block.source_shards.insert(f.shard_num, packet);
            }
            FecHeader::Repair(h) => {
                block.source_block_len.get_or_insert(h.source_block_len);
                block.repair_block_len.get_or_insert(h.repair_block_len);
                block.repair_shards.insert(h.shard_num, packet);
            }
        }

        let mut recovered = Vec::new();
        if block.is_recoverable() {
            if let Some(n) = block.source_block_len {
                for shard in 0..n {
                    if block.source_shards.contains_key(&shard) {
                        continue;
                    }
                    let Some(bytes) = self.codec.reconstruct(block, shard) else {
                        continue;
                    };
                    let rtp = match parse_rtp_header(&bytes) {
                        Ok(h) => h,
                        Err(e) => {
                            log::debug!(
                                "fec reader: reconstructed shard {shard} of block {block_num} is not a valid rtp packet: {e}"
                            );
                            continue;
                        }
                    };
                    let mut rebuilt = Packet::new(bytes);
                    rebuilt.rtp = Some(rtp);
                    rebuilt.fec = Some(FecHeader::Source(SourceFooter { block_num, shard_num: shard }));
                    rebuilt.flags.prepared = true;
                    rebuilt.flags.audio = true;
                    // Record the recovered shard so a later call doesn't
                    // re-run reconstruction for the same slot.
                    block.source_shards.insert(shard, rebuilt.clone());
                    recovered.push(rebuilt);
                }
            }
        }

        self.evict_stale();
        recovered
    }
}
