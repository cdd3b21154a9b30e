//! Declares a session dead on no-playable-frames for too long, or on
//! persistent silence/gaps beyond their own timeouts (spec.md §4.G
//! "Watchdog").

use std::time::Duration;

/// Coarse health label surfaced to metrics (spec.md §6 "watchdog
/// state"). Ordered roughly by severity; `is_dead` is the authority on
/// whether the session should actually be torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchdogState {
    #[default]
    Healthy,
    Silent,
    Gapped,
    Dead,
}

pub struct WatchdogConfig {
    pub no_playback_timeout: Duration,
    pub silence_timeout: Duration,
    pub gap_timeout: Duration,
}

pub struct Watchdog {
    cfg: WatchdogConfig,
    last_playable_ns: Option<u64>,
    silence_since_ns: Option<u64>,
    gap_since_ns: Option<u64>,
}

impl Watchdog {
    pub fn new(cfg: WatchdogConfig) -> Self {
        Self { cfg, last_playable_ns: None, silence_since_ns: None, gap_since_ns: None }
    }

    pub fn on_playable_frame(&mut self, now_ns: u64) {
        self.last_playable_ns = Some(now_ns);
    }

    pub fn on_silence(&mut self, now_ns: u64, is_silent: bool) {
        if is_silent {
            self.silence_since_ns.get_or_insert(now_ns);
        } else {
            self.silence_since_ns = None;
        }
    }

    pub fn on_gap(&mut self, now_ns: u64, has_gap: bool) {
        if has_gap {
            self.gap_since_ns.get_or_insert(now_ns);
        } else {
            self.gap_since_ns = None;
        }
    }

    /// `true` if any configured timeout has elapsed; the session should
    /// be torn down.
    pub fn is_dead(&self, now_ns: u64) -> bool {
        let no_playback_ns = self.cfg.no_playback_timeout.as_nanos() as u64;
        if let Some(last) = self.last_playable_ns {
            if now_ns.saturating_sub(last) >= no_playback_ns {
                return true;
            }
        } else {
            return false; // never played yet, not a timeout condition on its own
        }

        if let Some(since) = self.silence_since_ns {
            if now_ns.saturating_sub(since) >= self.cfg.silence_timeout.as_nanos() as u64 {
                return true;
            }
        }
        if let Some(since) = self.gap_since_ns {
            if now_ns.saturating_sub(since) >= self.cfg.gap_timeout.as_nanos() as u64 {
                return true;
            }
        }
        false
    }

    /// Snapshot for metrics: worst condition currently active.
    pub fn state(&self, now_ns: u64) -> WatchdogState {
        if self.is_dead(now_ns) {
            WatchdogState::Dead
        } else if self.silence_since_ns.is_some() {
            WatchdogState::Silent
        } else if self.gap_since_ns.is_some() {
            WatchdogState::Gapped
        } else {
            WatchdogState::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> WatchdogConfig {
        WatchdogConfig {
            no_playback_timeout: Duration::from_millis(100),
            silence_timeout: Duration::from_millis(50),
            gap_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn not_dead_before_any_frame_played() {
        let wd = Watchdog::new(cfg());
        assert!(!wd.is_dead(1_000_000_000));
    }

    #[test]
    fn dead_after_no_playback_timeout() {
        let mut wd = Watchdog::new(cfg());
        wd.on_playable_frame(0);
        assert!(!wd.is_dead(50_000_000));
        assert!(wd.is_dead(150_000_000));
    }

    #[test]
    fn dead_after_persistent_silence() {
        let mut wd = Watchdog::new(cfg());
        wd.on_playable_frame(0);
        wd.on_silence(0, true);
        assert!(wd.is_dead(60_000_000));
    }

    #[test]
    fn silence_clears_when_audio_resumes() {
        let mut wd = Watchdog::new(cfg());
        wd.on_playable_frame(0);
        wd.on_silence(0, true);
        wd.on_silence(10_000_000, false);
        assert!(!wd.is_dead(60_000_000));
    }

    #[test]
    fn state_reports_silent_before_the_silence_timeout_kills_it() {
        let mut wd = Watchdog::new(cfg());
        wd.on_playable_frame(0);
        wd.on_silence(0, true);
        assert_eq!(wd.state(10_000_000), WatchdogState::Silent);
        assert_eq!(wd.state(60_000_000), WatchdogState::Dead);
    }

    #[test]
    fn state_is_healthy_with_no_gap_or_silence() {
        let mut wd = Watchdog::new(cfg());
        wd.on_playable_frame(0);
        assert_eq!(wd.state(10_000_000), WatchdogState::Healthy);
    }
}
