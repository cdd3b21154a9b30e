//! Mixer: sums N input frame streams of identical sample spec into one
//! output frame (spec.md §4.J).

use super::frame::{Frame, FrameFlags};

/// Sums `inputs` sample-by-sample with saturation clamp to `[-1.0, 1.0]`
/// (the float domain's equivalent of the original's integer-PCM
/// saturation clamp). Empty inputs contribute zero. The output's
/// capture timestamp is the average of the non-zero inputs' timestamps,
/// for telemetry only — it does not gate anything downstream.
pub fn mix(inputs: &[Frame], num_channels: usize) -> Frame {
    if inputs.is_empty() {
        return Frame::silence(0, num_channels, 0);
    }

    let num_frames = inputs.iter().map(|f| f.num_frames()).max().unwrap_or(0);
    let mut out = vec![0.0f32; num_frames * num_channels];

    let mut ts_sum: u128 = 0;
    let mut ts_count: u64 = 0;

    for input in inputs {
        if input.flags == FrameFlags::Silence && input.num_frames() == 0 {
            continue;
        }
        let samples = input.samples();
        for i in 0..samples.len().min(out.len()) {
            out[i] += samples[i];
        }
        if input.num_frames() > 0 {
            ts_sum += input.capture_ts_ns as u128;
            ts_count += 1;
        }
    }

    for s in out.iter_mut() {
        *s = s.clamp(-1.0, 1.0);
    }

    let avg_ts = if ts_count > 0 { (ts_sum / ts_count as u128) as u64 } else { 0 };
    let any_original = inputs.iter().any(|f| f.is_original());
    let flags = if any_original { FrameFlags::Original } else { FrameFlags::Silence };

    Frame::new(out, num_channels, avg_ts, flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_two_inputs() {
        let a = Frame::new(vec![0.3, 0.3], 2, 100, FrameFlags::Original);
        let b = Frame::new(vec![0.2, 0.2], 2, 200, FrameFlags::Original);
        let out = mix(&[a, b], 2);
        assert!((out.samples()[0] - 0.5).abs() < 1e-6);
        assert_eq!(out.capture_ts_ns, 150);
    }

    #[test]
    fn clamps_overflow() {
        let a = Frame::new(vec![0.9, 0.9], 2, 0, FrameFlags::Original);
        let b = Frame::new(vec![0.9, 0.9], 2, 0, FrameFlags::Original);
        let out = mix(&[a, b], 2);
        assert_eq!(out.samples()[0], 1.0);
    }

    #[test]
    fn empty_input_list_is_silence() {
        let out = mix(&[], 2);
        assert_eq!(out.num_frames(), 0);
    }
}
