//! Moving min/max via a monotonic deque of (index, value) pairs
//! (spec.md §4.M), amortized O(1) per `add`.

use std::collections::VecDeque;

pub struct MovMinMax {
    capacity: usize,
    seq: u64,
    values: VecDeque<(u64, f64)>,
    min_deque: VecDeque<(u64, f64)>,
    max_deque: VecDeque<(u64, f64)>,
}

impl MovMinMax {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seq: 0,
            values: VecDeque::with_capacity(capacity),
            min_deque: VecDeque::new(),
            max_deque: VecDeque::new(),
        }
    }

    pub fn add(&mut self, x: f64) {
        let idx = self.seq;
        self.seq += 1;

        while self.min_deque.back().is_some_and(|&(_, v)| v >= x) {
            self.min_deque.pop_back();
        }
        self.min_deque.push_back((idx, x));

        while self.max_deque.back().is_some_and(|&(_, v)| v <= x) {
            self.max_deque.pop_back();
        }
        self.max_deque.push_back((idx, x));

        self.values.push_back((idx, x));
        if self.values.len() > self.capacity {
            let (evicted_idx, _) = self.values.pop_front().expect("over capacity implies non-empty");
            if self.min_deque.front().is_some_and(|&(i, _)| i == evicted_idx) {
                self.min_deque.pop_front();
            }
            if self.max_deque.front().is_some_and(|&(i, _)| i == evicted_idx) {
                self.max_deque.pop_front();
            }
        }
    }

    pub fn mov_min(&self) -> Option<f64> {
        self.min_deque.front().map(|&(_, v)| v)
    }

    pub fn mov_max(&self) -> Option<f64> {
        self.max_deque.front().map(|&(_, v)| v)
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn extend_win(&mut self, new_capacity: usize) {
        self.capacity = new_capacity.max(1);
    }
}
