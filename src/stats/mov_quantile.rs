//! Moving quantile over a fixed window via a partitioned two-heap
//! structure (spec.md §4.M): a max-heap for the lower partition, a
//! min-heap for the upper partition, split at the target quantile
//! rank. `add` is O(log N); eviction uses lazy deletion (a tombstone
//! set plus a live-count per heap) rather than O(N) heap rebuilds.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};

struct Entry {
    id: u64,
    value: f64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap_or(std::cmp::Ordering::Equal)
    }
}

pub struct MovQuantile {
    quantile: f64,
    capacity: usize,
    next_id: u64,
    window: VecDeque<(u64, f64)>,
    lower: BinaryHeap<Entry>,       // max-heap: largest of the lower partition on top
    upper: BinaryHeap<Reverse<Entry>>, // min-heap: smallest of the upper partition on top
    lower_live: usize,
    upper_live: usize,
    lower_side: HashSet<u64>, // which partition an id last landed in, for tombstone bookkeeping
    dead: HashSet<u64>,
}

impl MovQuantile {
    /// `quantile` in `[0.0, 1.0]`.
    pub fn new(quantile: f64, capacity: usize) -> Self {
        Self {
            quantile: quantile.clamp(0.0, 1.0),
            capacity: capacity.max(1),
            next_id: 0,
            window: VecDeque::with_capacity(capacity),
            lower: BinaryHeap::new(),
            upper: BinaryHeap::new(),
            lower_live: 0,
            upper_live: 0,
            lower_side: HashSet::new(),
            dead: HashSet::new(),
        }
    }

    fn target_lower_count(&self) -> usize {
        let n = self.lower_live + self.upper_live + 1; // +1 for the value about to be inserted
        ((self.quantile * n as f64).floor() as usize).min(n)
    }

    pub fn add(&mut self, x: f64) {
        let id = self.next_id;
        self.next_id += 1;

        let goes_lower = match self.lower.peek() {
            Some(top) if x <= top.value => true,
            None => true,
            _ => false,
        };
        if goes_lower {
            self.lower.push(Entry { id, value: x });
            self.lower_live += 1;
            self.lower_side.insert(id);
        } else {
            self.upper.push(Reverse(Entry { id, value: x }));
            self.upper_live += 1;
        }
        self.rebalance();

        self.window.push_back((id, x));
        if self.window.len() > self.capacity {
            let (evicted_id, _) = self.window.pop_front().expect("over capacity implies non-empty");
            self.dead.insert(evicted_id);
            if self.lower_side.remove(&evicted_id) {
                self.lower_live -= 1;
            } else {
                self.upper_live -= 1;
            }
            self.prune();
            self.rebalance();
        }
    }

    fn prune(&mut self) {
        while let Some(top) = self.lower.peek() {
            if self.dead.contains(&top.id) {
                let e = self.lower.pop().unwrap();
                self.dead.remove(&e.id);
            } else {
                break;
            }
        }
        while let Some(Reverse(top)) = self.upper.peek() {
            if self.dead.contains(&top.id) {
                let Reverse(e) = self.upper.pop().unwrap();
                self.dead.remove(&e.id);
            } else {
                break;
            }
        }
    }

    fn rebalance(&mut self) {
        let target = self.target_lower_count_stable();
        while self.lower_live > target {
            self.prune();
            if let Some(e) = self.lower.pop() {
                self.lower_side.remove(&e.id);
                self.lower_live -= 1;
                self.upper.push(Reverse(Entry { id: e.id, value: e.value }));
                self.upper_live += 1;
            } else {
                break;
            }
        }
        while self.lower_live < target {
            self.prune();
            if let Some(Reverse(e)) = self.upper.pop() {
                self.upper_live -= 1;
                self.lower.push(Entry { id: e.id, value: e.value });
                self.lower_side.insert(e.id);
                self.lower_live += 1;
            } else {
                break;
            }
        }
        self.prune();
    }

    fn target_lower_count_stable(&self) -> usize {
        let n = self.lower_live + self.upper_live;
        ((self.quantile * n as f64).floor() as usize).min(n)
    }

    pub fn mov_quantile(&mut self) -> Option<f64> {
        self.prune();
        if self.lower_live == 0 && self.upper_live == 0 {
            return None;
        }
        if self.lower_live > 0 {
            self.lower.peek().map(|e| e.value)
        } else {
            self.upper.peek().map(|Reverse(e)| e.value)
        }
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
    fn median_of_odd_window() {
        let mut q = MovQuantile::new(0.5, 5);
        for x in [5.0, 1.0, 3.0, 2.0, 4.0] {
            q.add(x);
        }
        assert_eq!(q.mov_quantile(), Some(3.0));
    }

    #[test]
    fn p90_of_ramp() {
        let mut q = MovQuantile::new(0.9, 10);
        for x in 1..=10 {
            q.add(x as f64);
        }
        let v = q.mov_quantile().unwrap();
        assert!(v >= 9.0 && v <= 10.0);
    }

    #[test]
    fn eviction_shifts_window() {
        let mut q = MovQuantile::new(0.5, 3);
        for x in [1.0, 2.0, 3.0, 100.0] {
            q.add(x);
        }
        // window holds [2, 3, 100]; median is 3.
        assert_eq!(q.mov_quantile(), Some(3.0));
    }
}
