//! Channel identity: bitset + layout + order (spec.md §3 "Channel Set").
//!
//! Grounded on `examples/original_source/.../roc_audio/channel_set.h`:
//! a fixed-size multi-word bitmask, a layout tag that gives channel
//! numbers their meaning, and an order tag that gives serialized
//! channels their position. No teacher crate has an equivalent type
//! (none of them carry surround/multitrack audio), so this is new
//! surface built in the teacher's plain-struct, no-inheritance idiom.

use std::fmt;

/// Maximum number of distinct channel positions a `ChannelSet` can name.
pub const MAX_CHANNELS: usize = 1024;

const WORD_BITS: usize = 64;
const NUM_WORDS: usize = MAX_CHANNELS / WORD_BITS;

/// A 0-31 bit mask shorthand for the common surround-channel case.
pub type ChannelMask = u32;

/// Named surround-channel positions, in the order the original
/// channel-mapping tables (see `channel_mapper_table.rs`) name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(usize)]
pub enum ChanPos {
    FrontLeft = 0,
    FrontRight = 1,
    FrontCenter = 2,
    LowFrequency = 3,
    BackLeft = 4,
    BackRight = 5,
    BackCenter = 6,
    SideLeft = 7,
    SideRight = 8,
    TopFrontLeft = 9,
    TopFrontRight = 10,
    TopMidLeft = 11,
    TopMidRight = 12,
    TopBackLeft = 13,
    TopBackRight = 14,
}

/// One past the last named position; also the matrix dimension used by
/// `ChannelMapper` (spec.md §4.B: "ChanPos_Max × ChanPos_Max coefficient
/// matrix").
pub const CHAN_POS_MAX: usize = 15;

/// Meaning of the channel numbers in a `ChannelSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelLayout {
    #[default]
    Invalid,
    Mono,
    Surround,
    Multitrack,
}

/// Order in which channels are serialized in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    None,
    Smpte,
    Alsa,
}

/// Channel identity: which channels are present, what they mean, and in
/// what order they're serialized. See spec.md §3.
#[derive(Clone, PartialEq, Eq)]
pub struct ChannelSet {
    words: [u64; NUM_WORDS],
    num_chans: u16,
    first_chan: u16,
    last_chan: u16,
    layout: ChannelLayout,
    order: ChannelOrder,
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSet {
    /// Construct an empty channel set (invalid until populated).
    pub fn new() -> Self {
        Self {
            words: [0; NUM_WORDS],
            num_chans: 0,
            first_chan: 0,
            last_chan: 0,
            layout: ChannelLayout::Invalid,
            order: ChannelOrder::None,
        }
    }

    /// Construct with a given layout/order and a 0-31 channel mask.
    pub fn from_mask(layout: ChannelLayout, order: ChannelOrder, mask: ChannelMask) -> Self {
        let mut cs = Self::new();
        cs.layout = layout;
        cs.order = order;
        cs.set_mask(mask);
        cs
    }

    /// `true` if layout is not `Invalid` and at least one channel is set.
    pub fn is_valid(&self) -> bool {
        self.layout != ChannelLayout::Invalid && self.num_chans > 0
    }

    pub fn clear(&mut self) {
        self.words = [0; NUM_WORDS];
        self.num_chans = 0;
        self.first_chan = 0;
        self.last_chan = 0;
        self.layout = ChannelLayout::Invalid;
        self.order = ChannelOrder::None;
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: ChannelLayout) {
        self.layout = layout;
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ChannelOrder) {
        self.order = order;
    }

    pub fn max_channels() -> usize {
        MAX_CHANNELS
    }

    pub fn num_channels(&self) -> usize {
        self.num_chans as usize
    }

    pub fn has_channel(&self, n: usize) -> bool {
        if n >= MAX_CHANNELS {
            return false;
        }
        (self.words[n / WORD_BITS] & (1u64 << (n % WORD_BITS))) != 0
    }

    /// Index of the first enabled channel. Returns `None` if empty,
    /// unlike the original's panic-on-empty contract, since a `Result`-
    /// free partial function is a poor fit for safe Rust.
    pub fn first_channel(&self) -> Option<usize> {
        if self.num_chans == 0 {
            None
        } else {
            Some(self.first_chan as usize)
        }
    }

    pub fn last_channel(&self) -> Option<usize> {
        if self.num_chans == 0 {
            None
        } else {
            Some(self.last_chan as usize)
        }
    }

    fn as_mask32(&self) -> Option<ChannelMask> {
        for (i, &w) in self.words.iter().enumerate() {
            if i == 0 {
                continue;
            }
            if w != 0 {
                return None;
            }
        }
        Some((self.words[0] & 0xFFFF_FFFF) as u32)
    }

    pub fn is_equal(&self, mask: ChannelMask) -> bool {
        self.as_mask32().map(|m| m == mask).unwrap_or(false)
    }

    pub fn is_subset(&self, mask: ChannelMask) -> bool {
        match self.as_mask32() {
            Some(m) => (m & !mask) == 0,
            None => false,
        }
    }

    pub fn is_superset(&self, mask: ChannelMask) -> bool {
        match self.as_mask32() {
            Some(m) => (mask & !m) == 0,
            None => false,
        }
    }

    pub fn set_mask(&mut self, mask: ChannelMask) {
        self.words = [0; NUM_WORDS];
        self.words[0] = mask as u64;
        self.reindex();
    }

    pub fn set_range(&mut self, from: usize, to: usize) {
        self.words = [0; NUM_WORDS];
        self.toggle_channel_range(from, to, true);
    }

    /// Enable the first `count` channels (a best-effort fallback, as the
    /// original documents: "Falls back to just enabling first N
    /// channels").
    pub fn set_count(&mut self, count: usize) {
        self.set_range(0, count.saturating_sub(1).max(0));
        if count == 0 {
            self.clear_chans();
        }
    }

    pub fn toggle_channel(&mut self, n: usize, enabled: bool) {
        if n >= MAX_CHANNELS {
            return;
        }
        let word = n / WORD_BITS;
        let bit = 1u64 << (n % WORD_BITS);
        if enabled {
            self.words[word] |= bit;
        } else {
            self.words[word] &= !bit;
        }
        self.reindex();
    }

    pub fn toggle_channel_range(&mut self, from: usize, to: usize, enabled: bool) {
        for n in from..=to.min(MAX_CHANNELS - 1) {
            let word = n / WORD_BITS;
            let bit = 1u64 << (n % WORD_BITS);
            if enabled {
                self.words[word] |= bit;
            } else {
                self.words[word] &= !bit;
            }
        }
        self.reindex();
    }

    /// Bitwise AND, preserving `self`'s layout tag (spec.md §3 invariant:
    /// "bitmask operations preserve layout tag of the left operand").
    pub fn bitwise_and(&mut self, other: &ChannelSet) {
        for i in 0..NUM_WORDS {
            self.words[i] &= other.words[i];
        }
        self.reindex();
    }

    pub fn bitwise_or(&mut self, other: &ChannelSet) {
        for i in 0..NUM_WORDS {
            self.words[i] |= other.words[i];
        }
        self.reindex();
    }

    pub fn bitwise_xor(&mut self, other: &ChannelSet) {
        for i in 0..NUM_WORDS {
            self.words[i] ^= other.words[i];
        }
        self.reindex();
    }

    pub fn num_bytes(&self) -> usize {
        MAX_CHANNELS / 8
    }

    pub fn byte_at(&self, n: usize) -> u8 {
        if n >= self.num_bytes() {
            return 0;
        }
        let word = self.words[n / 8];
        ((word >> ((n % 8) * 8)) & 0xFF) as u8
    }

    fn clear_chans(&mut self) {
        self.num_chans = 0;
        self.first_chan = 0;
        self.last_chan = 0;
    }

    fn reindex(&mut self) {
        let mut count = 0u16;
        let mut first = None;
        let mut last = 0u16;
        for n in 0..MAX_CHANNELS {
            if self.has_channel(n) {
                count += 1;
                if first.is_none() {
                    first = Some(n as u16);
                }
                last = n as u16;
            }
        }
        self.num_chans = count;
        self.first_chan = first.unwrap_or(0);
        self.last_chan = last;
    }
}

impl fmt::Debug for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChannelSet(layout={:?}, order={:?}, n={}, mask32={:#010x})",
            self.layout,
            self.order,
            self.num_chans,
            self.as_mask32().unwrap_or(0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_roundtrip() {
        let cs = ChannelSet::from_mask(ChannelLayout::Surround, ChannelOrder::Smpte, 0b0000_0011);
        assert!(cs.is_valid());
        assert_eq!(cs.num_channels(), 2);
        assert_eq!(cs.first_channel(), Some(0));
        assert_eq!(cs.last_channel(), Some(1));
        assert!(cs.is_equal(0b0000_0011));
        assert!(cs.is_subset(0b0000_0111));
        assert!(!cs.is_subset(0b0000_0001));
        assert!(cs.is_superset(0b0000_0001));
    }

    #[test]
    fn invalid_when_empty_or_no_layout() {
        let mut cs = ChannelSet::new();
        assert!(!cs.is_valid());
        cs.toggle_channel(0, true);
        assert!(!cs.is_valid()); // still Invalid layout
        cs.set_layout(ChannelLayout::Mono);
        assert!(cs.is_valid());
    }

    #[test]
    fn bitwise_and_preserves_left_layout() {
        let mut a = ChannelSet::from_mask(ChannelLayout::Surround, ChannelOrder::Smpte, 0b11);
        let b = ChannelSet::from_mask(ChannelLayout::Multitrack, ChannelOrder::Alsa, 0b01);
        a.bitwise_and(&b);
        assert_eq!(a.layout(), ChannelLayout::Surround);
        assert_eq!(a.num_channels(), 1);
    }

    #[test]
    fn range_and_count() {
        let mut cs = ChannelSet::new();
        cs.set_layout(ChannelLayout::Surround);
        cs.set_range(2, 4);
        assert_eq!(cs.num_channels(), 3);
        assert_eq!(cs.first_channel(), Some(2));
        assert_eq!(cs.last_channel(), Some(4));

        cs.set_count(2);
        assert_eq!(cs.num_channels(), 2);
        assert_eq!(cs.first_channel(), Some(0));
    }
}
