//! Batching `FrameWriter` adapter that channel-maps every frame before
//! forwarding it to an inner writer.
//!
//! Ported from `examples/original_source/.../roc_audio/channel_mapper_writer.cpp`.
//! The original's batching loop reads:
//!
//! ```cpp
//! const size_t n_write = std::max(n_samples, max_batch);
//! ```
//!
//! which is backwards: `n_write` bounds how much of the *remaining*
//! request fits in one fixed-size scratch buffer, so it must never
//! exceed `max_batch`, and `max(a, b) >= b` always. With a request
//! smaller than `max_batch` this silently reads past the caller's frame
//! (or, in the Rust port, would panic slicing past bounds). We implement
//! the evidently-intended `min(n_samples, max_batch)` instead (an Open
//! Question resolved by reading the original, not by the distilled
//! spec, which only flagged the mismatch).

use super::channel_mapper::ChannelMapper;
use super::frame::{Frame, FrameFlags, FrameWriter};
use super::sample_spec::SampleSpec;
use crate::error::StatusResult;

/// Largest number of frames mapped into the scratch buffer per batch.
const MAX_BATCH: usize = 512;

/// Wraps an inner `FrameWriter`, channel-mapping every frame written to
/// it from `in_spec`'s channel set to `out_spec`'s.
pub struct ChannelMapperWriter<W: FrameWriter> {
    output_writer: W,
    mapper: Option<ChannelMapper>,
    in_spec: SampleSpec,
    out_spec: SampleSpec,
    scratch: Vec<f32>,
}

impl<W: FrameWriter> ChannelMapperWriter<W> {
    /// `in_spec` and `out_spec` must share the same sample rate; channel
    /// mapping never resamples (spec.md §4.C Non-goals).
    pub fn new(output_writer: W, in_spec: SampleSpec, out_spec: SampleSpec) -> Self {
        assert_eq!(
            in_spec.sample_rate, out_spec.sample_rate,
            "channel mapper does not resample"
        );
        let mapper_enabled = in_spec.channels != out_spec.channels;
        let mapper = mapper_enabled
            .then(|| ChannelMapper::new(in_spec.clone(), out_spec.clone()));
        let out_chans = out_spec.num_channels().max(1);
        Self {
            output_writer,
            mapper,
            in_spec,
            out_spec,
            scratch: vec![0.0; MAX_BATCH * out_chans],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.in_spec.sample_rate == self.out_spec.sample_rate
    }
}

impl<W: FrameWriter> FrameWriter for ChannelMapperWriter<W> {
    fn write(&mut self, frame: &Frame) -> StatusResult<()> {
        let Some(mapper) = &self.mapper else {
            return self.output_writer.write(frame);
        };

        let in_chans = self.in_spec.num_channels().max(1);
        let out_chans = self.out_spec.num_channels().max(1);
        let total_frames = frame.num_frames();
        let samples = frame.samples();

        let mut pos = 0usize;
        while pos < total_frames {
            let remaining = total_frames - pos;
            let n_write = remaining.min(MAX_BATCH);

            let in_slice = &samples[pos * in_chans..(pos + n_write) * in_chans];
            let out_slice = &mut self.scratch[..n_write * out_chans];
            mapper.map(in_slice, out_slice, n_write);

            let batch = Frame::new(out_slice.to_vec(), out_chans, frame.capture_ts_ns, frame.flags);
            self.output_writer.write(&batch)?;

            pos += n_write;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::channel_set::{ChannelLayout, ChannelOrder, ChannelSet};
    use crate::audio::channel_mapper_table::{MASK_2_1, MASK_MONO};
    use crate::audio::sample_spec::SampleFormat;
    use std::sync::{Arc, Mutex};

    struct CollectingWriter(Arc<Mutex<Vec<Frame>>>);
    impl FrameWriter for CollectingWriter {
        fn write(&mut self, frame: &Frame) -> StatusResult<()> {
            self.0.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }

    #[test]
    fn batches_respect_max_batch_not_overrun_it() {
        let in_set = ChannelSet::from_mask(ChannelLayout::Surround, ChannelOrder::Smpte, MASK_2_1);
        let out_set = ChannelSet::from_mask(ChannelLayout::Surround, ChannelOrder::Smpte, MASK_MONO);
        let in_spec = SampleSpec::new(48_000, SampleFormat::F32, in_set);
        let out_spec = SampleSpec::new(48_000, SampleFormat::F32, out_set);

        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut writer = ChannelMapperWriter::new(CollectingWriter(sink.clone()), in_spec, out_spec);

        // More than one MAX_BATCH worth of frames: must split into >= 2 writes.
        let n_frames = MAX_BATCH + 100;
        let samples = vec![0.1f32; n_frames * 3];
        let frame = Frame::new(samples, 3, 0, FrameFlags::Original);
        writer.write(&frame).unwrap();

        let batches = sink.lock().unwrap();
        assert!(batches.len() >= 2);
        let total: usize = batches.iter().map(|f| f.num_frames()).sum();
        assert_eq!(total, n_frames);
        for b in batches.iter() {
            assert!(b.num_frames() <= MAX_BATCH);
        }
    }

    #[test]
    fn small_request_is_not_overread() {
        let in_set = ChannelSet::from_mask(ChannelLayout::Surround, ChannelOrder::Smpte, MASK_2_1);
        let out_set = ChannelSet::from_mask(ChannelLayout::Surround, ChannelOrder::Smpte, MASK_MONO);
        let in_spec = SampleSpec::new(48_000, SampleFormat::F32, in_set);
        let out_spec = SampleSpec::new(48_000, SampleFormat::F32, out_set);

        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut writer = ChannelMapperWriter::new(CollectingWriter(sink.clone()), in_spec, out_spec);

        let samples = vec![0.2f32; 10 * 3];
        let frame = Frame::new(samples, 3, 0, FrameFlags::Original);
        writer.write(&frame).unwrap();

        let batches = sink.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_frames(), 10);
    }
}
