//! Slot: a set of related endpoints (source/repair/control) sharing one
//! session group (spec.md §3 "Slot", component share I).

use crate::audio::frame::Frame;
use crate::netio::endpoint::{Endpoint, InterfaceKind};
use crate::session::SessionGroup;

pub struct Slot {
    pub index: usize,
    source: Option<Endpoint>,
    repair: Option<Endpoint>,
    control: Option<Endpoint>,
    group: SessionGroup,
    broken: bool,
}

impl Slot {
    pub fn new(index: usize, group: SessionGroup) -> Self {
        Self { index, source: None, repair: None, control: None, group, broken: false }
    }

    pub fn add_endpoint(&mut self, endpoint: Endpoint) {
        match endpoint.kind() {
            InterfaceKind::AudioSource => self.source = Some(endpoint),
            InterfaceKind::AudioRepair => self.repair = Some(endpoint),
            InterfaceKind::AudioControl => self.control = Some(endpoint),
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Drain every endpoint this slot owns and route packets into the
    /// session group.
    pub fn pull_packets(&mut self) {
        for endpoint in [&self.source, &self.repair, &self.control].into_iter().flatten() {
            for packet in endpoint.pull_packets() {
                self.group.handle_packet(packet);
            }
        }
    }

    /// Drains every endpoint's queued packets and discards them without
    /// routing them into the session group — the graceful-teardown step
    /// a slot takes before it's removed (spec.md §6.1).
    pub fn drain_and_discard(&mut self) {
        for endpoint in [&self.source, &self.repair, &self.control].into_iter().flatten() {
            let _ = endpoint.pull_packets();
        }
    }

    pub fn read_frames(&mut self, now_ns: u64) -> Vec<Frame> {
        self.group.read_all(now_ns)
    }

    pub fn refresh(&mut self, now_ns: u64) -> u64 {
        self.group.refresh_sessions(now_ns)
    }

    pub fn group(&self) -> &SessionGroup {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut SessionGroup {
        &mut self.group
    }
}
