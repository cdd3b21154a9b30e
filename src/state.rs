//! Device state tracker: holds `{Active, Idle, Paused, Broken}` plus a
//! pending-packets counter, with `wait_state` blocking until a mask
//! matches or a deadline passes (spec.md §4.N).
//!
//! Grounded on `parking_lot::Condvar`'s multi-waiter wake pattern, used
//! the way `bass-ptp`'s ref-counted start/stop state machine gates
//! threads on a shared flag, generalized to a bitmask wait.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceState {
    Active = 0b0001,
    Idle = 0b0010,
    Paused = 0b0100,
    Broken = 0b1000,
}

pub type StateMask = u8;

struct Inner {
    state: DeviceState,
    pending_packets: u64,
}

/// Shared state plus the condvar used to wake `wait_state` callers.
pub struct StateTracker {
    inner: Mutex<Inner>,
    cv: Condvar,
}

impl StateTracker {
    pub fn new(initial: DeviceState) -> Self {
        Self { inner: Mutex::new(Inner { state: initial, pending_packets: 0 }), cv: Condvar::new() }
    }

    pub fn state(&self) -> DeviceState {
        self.inner.lock().state
    }

    pub fn set_state(&self, state: DeviceState) {
        let mut inner = self.inner.lock();
        inner.state = state;
        self.cv.notify_all();
    }

    pub fn pending_packets(&self) -> u64 {
        self.inner.lock().pending_packets
    }

    /// Bumps the pending-packet counter and wakes waiters whose mask
    /// includes `Active` (spec.md §4.N).
    pub fn register_packet(&self) {
        let mut inner = self.inner.lock();
        inner.pending_packets += 1;
        if (inner.state as u8) & (DeviceState::Active as u8) != 0 {
            self.cv.notify_all();
        }
    }

    /// Blocks until `state() & mask != 0` or `deadline` passes. Returns
    /// the state observed when it woke.
    pub fn wait_state(&self, mask: StateMask, deadline: Instant) -> DeviceState {
        let mut inner = self.inner.lock();
        loop {
            if (inner.state as u8) & mask != 0 {
                return inner.state;
            }
            let now = Instant::now();
            if now >= deadline {
                return inner.state;
            }
            let timeout = deadline - now;
            let result = self.cv.wait_for(&mut inner, timeout);
            if result.timed_out() && (inner.state as u8) & mask == 0 {
                return inner.state;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_state_returns_immediately_when_already_matching() {
        let tracker = StateTracker::new(DeviceState::Active);
        let deadline = Instant::now() + Duration::from_millis(10);
        let s = tracker.wait_state(DeviceState::Active as u8, deadline);
        assert_eq!(s, DeviceState::Active);
    }

    #[test]
    fn wait_state_times_out_without_match() {
        let tracker = StateTracker::new(DeviceState::Idle);
        let deadline = Instant::now() + Duration::from_millis(20);
        let s = tracker.wait_state(DeviceState::Broken as u8, deadline);
        assert_eq!(s, DeviceState::Idle);
    }

    #[test]
    fn set_state_wakes_waiter() {
        let tracker = Arc::new(StateTracker::new(DeviceState::Idle));
        let t2 = tracker.clone();
        let handle = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(2);
            t2.wait_state(DeviceState::Active as u8, deadline)
        });
        thread::sleep(Duration::from_millis(20));
        tracker.set_state(DeviceState::Active);
        let observed = handle.join().unwrap();
        assert_eq!(observed, DeviceState::Active);
    }

    #[test]
    fn register_packet_increments_counter() {
        let tracker = StateTracker::new(DeviceState::Active);
        tracker.register_packet();
        tracker.register_packet();
        assert_eq!(tracker.pending_packets(), 2);
    }
}
