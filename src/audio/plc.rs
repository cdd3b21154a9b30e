//! Packet-loss concealment: replaces gap frames with synthesized audio.
//!
//! Grounded on `bass-aes67::input::jitter::JitterBuffer`'s
//! `load_next_packet` gap-filling path (it currently just repeats
//! silence); we promote the "pluggable backend" from spec.md §4.G into a
//! trait so a real concealment algorithm can be swapped in without
//! touching the session DSP chain.

use super::frame::{Frame, FrameFlags};

/// Synthesizes replacement samples for a gap of `num_frames` at
/// `num_channels`, given the most recent real samples for context.
pub trait PlcBackend: Send {
    fn conceal(&mut self, num_frames: usize, num_channels: usize, last_good: &[f32]) -> Vec<f32>;
}

/// Repeats the last good frame's tail, decaying toward silence — a
/// conservative default that never invents pitch (per spec.md §4.G:
/// "never extends beyond a configured horizon").
#[derive(Default)]
pub struct RepeatDecayPlc;

impl PlcBackend for RepeatDecayPlc {
    fn conceal(&mut self, num_frames: usize, num_channels: usize, last_good: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; num_frames * num_channels];
        if last_good.len() < num_channels {
            return out;
        }
        let tail = &last_good[last_good.len() - num_channels..];
        for f in 0..num_frames {
            let decay = 1.0 - (f as f32 / num_frames.max(1) as f32);
            for c in 0..num_channels {
                out[f * num_channels + c] = tail[c] * decay;
            }
        }
        out
    }
}

/// Bounds how long PLC will keep concealing a single run of missing
/// samples before giving up and emitting silence instead.
pub struct PlcStage {
    backend: Box<dyn PlcBackend>,
    horizon_frames: usize,
    concealed_run: usize,
    last_good: Vec<f32>,
}

impl PlcStage {
    pub fn new(backend: Box<dyn PlcBackend>, horizon_frames: usize) -> Self {
        Self { backend, horizon_frames, concealed_run: 0, last_good: Vec::new() }
    }

    pub fn on_original(&mut self, frame: &Frame) {
        self.last_good = frame.samples().to_vec();
        self.concealed_run = 0;
    }

    /// Whether this session is currently inside a concealed (non-silent)
    /// run, for metrics (spec.md §6 "current PLC activity").
    pub fn is_active(&self) -> bool {
        self.concealed_run > 0 && self.concealed_run < self.horizon_frames
    }

    /// Fill a gap frame, switching to plain silence once `horizon_frames`
    /// of continuous concealment have already been produced.
    pub fn conceal_gap(&mut self, num_frames: usize, num_channels: usize, capture_ts_ns: u64) -> Frame {
        if self.concealed_run >= self.horizon_frames {
            return Frame::silence(num_frames, num_channels, capture_ts_ns);
        }
        self.concealed_run += num_frames;
        let samples = self.backend.conceal(num_frames, num_channels, &self.last_good);
        Frame::new(samples, num_channels, capture_ts_ns, FrameFlags::PlcSynthesized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_decay_tapers_to_zero() {
        let mut plc = RepeatDecayPlc;
        let last_good = vec![1.0f32, 1.0];
        let out = plc.conceal(4, 2, &last_good);
        assert_eq!(out.len(), 8);
        assert!(out[0] > out[out.len() - 2]);
    }

    #[test]
    fn horizon_falls_back_to_silence() {
        let mut stage = PlcStage::new(Box::new(RepeatDecayPlc), 10);
        stage.on_original(&Frame::new(vec![1.0, 1.0], 2, 0, FrameFlags::Original));

        let f1 = stage.conceal_gap(8, 2, 100);
        assert_eq!(f1.flags, FrameFlags::PlcSynthesized);

        // concealed_run is now 8, next request of 8 pushes past horizon.
        let f2 = stage.conceal_gap(8, 2, 200);
        assert_eq!(f2.flags, FrameFlags::Silence);
    }

    #[test]
    fn is_active_tracks_concealment_within_horizon() {
        let mut stage = PlcStage::new(Box::new(RepeatDecayPlc), 10);
        stage.on_original(&Frame::new(vec![1.0, 1.0], 2, 0, FrameFlags::Original));
        assert!(!stage.is_active());

        stage.conceal_gap(4, 2, 100);
        assert!(stage.is_active());

        stage.on_original(&Frame::new(vec![1.0, 1.0], 2, 0, FrameFlags::Original));
        assert!(!stage.is_active());
    }
}
