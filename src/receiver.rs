//! Receiver Source: the top-level frame producer aggregating all slots
//! through the mixer (spec.md §4.K).

use crate::audio::frame::{Frame, FrameFlags};
use crate::audio::mixer;
use crate::audio::sample_spec::SampleSpec;
use crate::slot::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Active,
    Idle,
    Broken,
}

/// Whether `read` must return exactly `duration` samples (padding with
/// silence) or may return fewer (spec.md §4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Hard,
    Soft,
}

pub struct ReceiverSource {
    spec: SampleSpec,
    slots: Vec<Slot>,
}

impl ReceiverSource {
    pub fn new(spec: SampleSpec, slots: Vec<Slot>) -> Self {
        Self { spec, slots }
    }

    pub fn sample_spec(&self) -> &SampleSpec {
        &self.spec
    }

    pub fn add_slot(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    /// Graceful teardown: drain the slot's endpoints so queued packets
    /// never reach a session group that's about to disappear, then drop
    /// it (spec.md §6.1).
    pub fn remove_slot(&mut self, index: usize) {
        if let Some(pos) = self.slots.iter().position(|s| s.index == index) {
            let mut slot = self.slots.remove(pos);
            slot.drain_and_discard();
        }
    }

    pub fn has_slot(&self, index: usize) -> bool {
        self.slots.iter().any(|s| s.index == index)
    }

    /// Fill up to `duration_frames` samples-per-channel into `frame`.
    /// `Hard` mode pads the tail with silence when no session has that
    /// much audio; `Soft` mode may return fewer frames than requested.
    pub fn read(&mut self, now_ns: u64, duration_frames: usize, mode: ReadMode) -> Frame {
        let num_channels = self.spec.num_channels().max(1);

        let mut per_slot_frames = Vec::with_capacity(self.slots.len());
        for slot in &mut self.slots {
            slot.pull_packets();
            per_slot_frames.extend(slot.read_frames(now_ns));
        }

        let mixed = mixer::mix(&per_slot_frames, num_channels);

        let got_frames = mixed.num_frames();
        if got_frames >= duration_frames || mode == ReadMode::Soft {
            return mixed;
        }

        // Hard mode: pad the shortfall with silence.
        let mut samples = mixed.samples().to_vec();
        samples.resize(duration_frames * num_channels, 0.0);
        Frame::new(samples, num_channels, mixed.capture_ts_ns, FrameFlags::Silence)
    }

    /// Housekeeping across all slots; returns the earliest deadline any
    /// of them need another refresh by (spec.md §4.K `refresh`).
    pub fn refresh(&mut self, now_ns: u64) -> u64 {
        self.slots.iter_mut().map(|s| s.refresh(now_ns)).min().unwrap_or(now_ns + 10_000_000)
    }

    /// Propagate the sink's playback clock to every slot's sessions
    /// (spec.md §4.K `reclock`).
    pub fn reclock(&mut self, playback_time_ns: u64) {
        for slot in &mut self.slots {
            for (_, session) in slot.group_mut().sessions_mut() {
                session.reclock(playback_time_ns);
            }
        }
    }

    pub fn state(&self) -> ReceiverState {
        if self.slots.iter().any(|s| s.is_broken()) {
            ReceiverState::Broken
        } else if self.slots.iter().any(|s| s.group().num_sessions() > 0) {
            ReceiverState::Active
        } else {
            ReceiverState::Idle
        }
    }
}
