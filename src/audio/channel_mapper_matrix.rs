//! Downmix/upmix coefficient matrix builder.
//!
//! Ported from `examples/original_source/.../roc_audio/channel_mapper_matrix.cpp`:
//! build a compacted index map for each channel set (position -> row/
//! column, in the set's channel order), pick the narrowest applicable
//! table from `channel_mapper_table.rs` (trying both the direct
//! downmix direction and the reversed upmix direction, inverting
//! coefficients when reversed), fall back to an identity mapping over
//! the channels the two sets share, then normalize each output row so
//! row weights sum to 1 (unit loudness, spec.md §4.C invariant).

use super::channel_set::{ChanPos, ChannelSet, CHAN_POS_MAX};
use super::channel_mapper_table::{self, ChannelMapTable};

/// A built `out_chans x in_chans` coefficient matrix plus the index maps
/// needed to address it by compacted channel position.
#[derive(Debug, Clone)]
pub struct ChannelMapperMatrix {
    in_chans: usize,
    out_chans: usize,
    matrix: Vec<f32>,
    in_index: [Option<usize>; CHAN_POS_MAX],
    out_index: [Option<usize>; CHAN_POS_MAX],
}

impl ChannelMapperMatrix {
    pub fn build(in_set: &ChannelSet, out_set: &ChannelSet) -> Self {
        let in_index = build_index_mapping(in_set);
        let out_index = build_index_mapping(out_set);
        let in_chans = in_set.num_channels();
        let out_chans = out_set.num_channels();

        let mut m = Self {
            in_chans,
            out_chans,
            matrix: vec![0.0; out_chans * in_chans],
            in_index,
            out_index,
        };

        match select_mapping_table(in_set, out_set) {
            Some((table, reversed)) => m.build_table_matrix(table, reversed),
            None => m.build_diagonal_matrix(in_set, out_set),
        }
        m.normalize_matrix();
        m
    }

    pub fn in_chans(&self) -> usize {
        self.in_chans
    }

    pub fn out_chans(&self) -> usize {
        self.out_chans
    }

    /// Coefficient contributing `in[in_ch]` to `out[out_ch]`, or 0 if
    /// either position isn't present in its channel set.
    pub fn coeff(&self, out_ch: ChanPos, in_ch: ChanPos) -> f32 {
        let (Some(o), Some(i)) = (self.out_index[out_ch as usize], self.in_index[in_ch as usize])
        else {
            return 0.0;
        };
        self.matrix[o * self.in_chans + i]
    }

    fn set_coeff(&mut self, out_ch: ChanPos, in_ch: ChanPos, coeff: f32) {
        let (Some(o), Some(i)) = (self.out_index[out_ch as usize], self.in_index[in_ch as usize])
        else {
            return;
        };
        self.matrix[o * self.in_chans + i] = coeff;
    }

    fn build_table_matrix(&mut self, table: &ChannelMapTable, reversed: bool) {
        for rule in table.rules {
            if reversed {
                let coeff = if rule.coeff != 0.0 { 1.0 / rule.coeff } else { 0.0 };
                self.set_coeff(rule.in_ch, rule.out_ch, coeff);
            } else {
                self.set_coeff(rule.out_ch, rule.in_ch, rule.coeff);
            }
        }
    }

    /// No table matched: map every channel present in both sets straight
    /// through at unit gain.
    fn build_diagonal_matrix(&mut self, in_set: &ChannelSet, out_set: &ChannelSet) {
        for n in 0..CHAN_POS_MAX {
            if in_set.has_channel(n) && out_set.has_channel(n) {
                let pos = POSITIONS[n];
                self.set_coeff(pos, pos, 1.0);
            }
        }
    }

    fn normalize_matrix(&mut self) {
        for o in 0..self.out_chans {
            let row = &mut self.matrix[o * self.in_chans..(o + 1) * self.in_chans];
            let sum: f32 = row.iter().sum();
            if sum > 0.0 {
                for c in row.iter_mut() {
                    *c /= sum;
                }
            }
        }
    }
}

const POSITIONS: [ChanPos; CHAN_POS_MAX] = [
    ChanPos::FrontLeft,
    ChanPos::FrontRight,
    ChanPos::FrontCenter,
    ChanPos::LowFrequency,
    ChanPos::BackLeft,
    ChanPos::BackRight,
    ChanPos::BackCenter,
    ChanPos::SideLeft,
    ChanPos::SideRight,
    ChanPos::TopFrontLeft,
    ChanPos::TopFrontRight,
    ChanPos::TopMidLeft,
    ChanPos::TopMidRight,
    ChanPos::TopBackLeft,
    ChanPos::TopBackRight,
];

/// Assign each enabled channel in `set` a compacted 0-based index, in the
/// order `set`'s `ChannelOrder` table lists positions.
fn build_index_mapping(set: &ChannelSet) -> [Option<usize>; CHAN_POS_MAX] {
    let mut out = [None; CHAN_POS_MAX];
    let order = channel_mapper_table::order_table(set.order());
    let mut next = 0usize;
    for &pos in order {
        if set.has_channel(pos as usize) {
            out[pos as usize] = Some(next);
            next += 1;
        }
    }
    out
}

/// Returns the narrowest applicable table and whether it's being applied
/// in reverse (upmix) direction, or `None` if nothing matches.
fn select_mapping_table<'t>(
    in_set: &ChannelSet,
    out_set: &ChannelSet,
) -> Option<(&'t ChannelMapTable, bool)> {
    for table in channel_mapper_table::CHAN_MAPS {
        if in_set.is_subset(table.in_mask) && out_set.is_subset(table.out_mask) {
            return Some((table, false));
        }
        if in_set.is_subset(table.out_mask) && out_set.is_subset(table.in_mask) {
            return Some((table, true));
        }
    }
    None
}
