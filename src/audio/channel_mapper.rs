//! Public channel-mapping API: applies a `ChannelMapperMatrix` to
//! interleaved `f32` frames.
//!
//! Grounded on `examples/original_source/.../roc_audio/channel_mapper.cpp`
//! (not present verbatim in the retrieved pack, but named by
//! `channel_mapper_matrix.h`'s surrounding class); the shape — hold a
//! built matrix, expose a `map()` over interleaved buffers — follows the
//! matrix/writer split the original keeps.

use super::channel_mapper_matrix::ChannelMapperMatrix;
use super::channel_set::{ChannelSet, CHAN_POS_MAX};
use super::sample_spec::SampleSpec;

/// Applies a fixed in/out channel mapping to interleaved float samples.
pub struct ChannelMapper {
    in_spec: SampleSpec,
    out_spec: SampleSpec,
    matrix: ChannelMapperMatrix,
}

impl ChannelMapper {
    pub fn new(in_spec: SampleSpec, out_spec: SampleSpec) -> Self {
        let matrix = ChannelMapperMatrix::build(&in_spec.channels, &out_spec.channels);
        Self { in_spec, out_spec, matrix }
    }

    pub fn in_spec(&self) -> &SampleSpec {
        &self.in_spec
    }

    pub fn out_spec(&self) -> &SampleSpec {
        &self.out_spec
    }

    /// `true` if input and output channel sets are identical (mapping is
    /// a no-op and callers may bypass this stage entirely).
    pub fn is_identity(&self) -> bool {
        self.in_spec.channels == self.out_spec.channels
    }

    /// Map `n_frames` interleaved frames from `in_samples` into
    /// `out_samples`. Buffer lengths must be at least
    /// `n_frames * {in,out}_chans`.
    pub fn map(&self, in_samples: &[f32], out_samples: &mut [f32], n_frames: usize) {
        let in_chans = self.matrix.in_chans();
        let out_chans = self.matrix.out_chans();
        debug_assert!(in_samples.len() >= n_frames * in_chans);
        debug_assert!(out_samples.len() >= n_frames * out_chans);

        let positions = all_positions(&self.in_spec.channels, &self.out_spec.channels);

        for f in 0..n_frames {
            let in_frame = &in_samples[f * in_chans..f * in_chans + in_chans];
            let out_frame = &mut out_samples[f * out_chans..f * out_chans + out_chans];
            for v in out_frame.iter_mut() {
                *v = 0.0;
            }
            for &out_pos in &positions.out {
                let mut acc = 0.0f32;
                for &in_pos in &positions.in_ {
                    let c = self.matrix.coeff(out_pos, in_pos);
                    if c != 0.0 {
                        if let Some(idx) = channel_index(&self.in_spec.channels, in_pos) {
                            acc += c * in_frame[idx];
                        }
                    }
                }
                if let Some(idx) = channel_index(&self.out_spec.channels, out_pos) {
                    out_frame[idx] = acc;
                }
            }
        }
    }
}

struct Positions {
    in_: Vec<super::channel_set::ChanPos>,
    out: Vec<super::channel_set::ChanPos>,
}

fn all_positions(in_set: &ChannelSet, out_set: &ChannelSet) -> Positions {
    use super::channel_set::ChanPos;
    const ALL: [ChanPos; CHAN_POS_MAX] = [
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
    Positions {
        in_: ALL.iter().copied().filter(|&p| in_set.has_channel(p as usize)).collect(),
        out: ALL.iter().copied().filter(|&p| out_set.has_channel(p as usize)).collect(),
    }
}

/// Position's compacted index within `set`, in `set`'s channel order.
fn channel_index(set: &ChannelSet, pos: super::channel_set::ChanPos) -> Option<usize> {
    use super::channel_mapper_table::order_table;
    let order = order_table(set.order());
    let mut idx = 0usize;
    for &p in order {
        if set.has_channel(p as usize) {
            if p == pos {
                return Some(idx);
            }
            idx += 1;
        }
    }
    None
}
