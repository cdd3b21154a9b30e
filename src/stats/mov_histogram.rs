//! Fixed-bin moving histogram (spec.md §4.M): O(1) `add`, O(B) quantile
//! lookup by scanning bin counts. Used where exact quantile tracking
//! (`MovQuantile`) is too costly relative to the approximation the
//! caller actually needs (e.g. coarse jitter histograms for telemetry).

use std::collections::VecDeque;

pub struct MovHistogram {
    capacity: usize,
    lo: f64,
    hi: f64,
    bins: Vec<u64>,
    window: VecDeque<usize>, // bin index per sample, for eviction
}

impl MovHistogram {
    pub fn new(capacity: usize, lo: f64, hi: f64, num_bins: usize) -> Self {
        let num_bins = num_bins.max(1);
        Self {
            capacity: capacity.max(1),
            lo,
            hi: hi.max(lo + f64::EPSILON),
            bins: vec![0; num_bins],
            window: VecDeque::with_capacity(capacity),
        }
    }

    fn bin_of(&self, x: f64) -> usize {
        let span = self.hi - self.lo;
        let frac = ((x - self.lo) / span).clamp(0.0, 1.0);
        let idx = (frac * self.bins.len() as f64) as usize;
        idx.min(self.bins.len() - 1)
    }

    pub fn add(&mut self, x: f64) {
        let idx = self.bin_of(x);
        self.bins[idx] += 1;
        self.window.push_back(idx);
        if self.window.len() > self.capacity {
            let evicted = self.window.pop_front().expect("over capacity implies non-empty");
            self.bins[evicted] -= 1;
        }
    }

    /// Approximate quantile by scanning cumulative bin counts.
    pub fn mov_quantile(&self, quantile: f64) -> Option<f64> {
        let total: u64 = self.bins.iter().sum();
        if total == 0 {
            return None;
        }
        let target = ((quantile.clamp(0.0, 1.0) * total as f64).ceil() as u64).max(1);
        let mut cum = 0u64;
        let span = self.hi - self.lo;
        let bin_width = span / self.bins.len() as f64;
        for (i, &count) in self.bins.iter().enumerate() {
            cum += count;
            if cum >= target {
                return Some(self.lo + bin_width * (i as f64 + 0.5));
            }
        }
        Some(self.hi)
    }

    pub fn is_full(&self) -> bool {
        self.window.len() >= self.capacity
    }

    pub fn extend_win(&mut self, new_capacity: usize) {
        self.capacity = new_capacity.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_uniform_samples() {
        let mut h = MovHistogram::new(100, 0.0, 100.0, 10);
        for x in 0..100 {
            h.add(x as f64);
        }
        let median = h.mov_quantile(0.5).unwrap();
        assert!((median - 50.0).abs() < 10.0);
    }

    #[test]
    fn eviction_removes_oldest_bin_count() {
        let mut h = MovHistogram::new(2, 0.0, 10.0, 2);
        h.add(9.0); // high bin
        h.add(1.0); // low bin
        h.add(1.0); // evicts the 9.0 sample
        assert!(h.mov_quantile(0.99).unwrap() < 6.0);
    }
}
