//! Moving average/variance over a fixed-size ring window, maintained
//! incrementally via Welford's algorithm (spec.md §4.M).
//!
//! Per spec.md §9's Open Question resolution: only Welford's one-pass
//! estimator is implemented. The two-pass `MovAggregate` variant named
//! in the original source is deliberately not ported — it recomputes
//! the mean from scratch every window slide, an O(N) cost this
//! estimator avoids entirely.

use std::collections::VecDeque;

pub struct MovAvg {
    window: VecDeque<f64>,
    capacity: usize,
    mean: f64,
    m2: f64,
}

impl MovAvg {
    pub fn new(capacity: usize) -> Self {
        Self { window: VecDeque::with_capacity(capacity), capacity: capacity.max(1), mean: 0.0, m2: 0.0 }
    }

    /// Push a new sample, evicting the oldest if the window is full.
    /// Mean/variance are updated incrementally, never recomputed from
    /// scratch.
    pub fn add(&mut self, x: f64) {
        if self.window.len() == self.capacity {
            let removed = self.window.pop_front().expect("window at capacity is non-empty");
            let n = self.window.len() as f64;
            if n > 0.0 {
                let old_mean = self.mean;
                self.mean = old_mean + (old_mean - removed) / n;
                self.m2 -= (removed - old_mean) * (removed - self.mean);
                self.m2 = self.m2.max(0.0);
            } else {
                self.mean = 0.0;
                self.m2 = 0.0;
            }
        }

        self.window.push_back(x);
        let n = self.window.len() as f64;
        let delta = x - self.mean;
        self.mean += delta / n;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn mov_avg(&self) -> f64 {
        self.mean
    }

    pub fn mov_variance(&self) -> f64 {
        let n = self.window.len() as f64;
        if n < 2.0 {
            0.0
        } else {
            self.m2 / n
        }
    }

    pub fn is_full(&self) -> bool {
        self.window.len() >= self.capacity
    }

    /// Grow the window in place. Existing samples stay; the additional
    /// capacity starts empty, so mean/variance over the newly widened
    /// window is transiently inaccurate until it refills (spec.md §4.M:
    /// "old samples beyond the previous window are not reconstructed").
    pub fn extend_win(&mut self, new_capacity: usize) {
        self.capacity = new_capacity.max(1);
    }
}
