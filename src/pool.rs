//! Fixed-size slab pool backing `Packet` buffers on the hot ingest path
//! (spec.md §4.A). `Frame`'s sample buffers stay plain `Vec<f32>` — this
//! pool only carves byte slots, and pooling the DSP chain's f32 buffers
//! would need an unsafe byte/f32 transmute this crate doesn't take on.
//!
//! No teacher crate carries an allocator of this shape (they all lean
//! on plain `Vec`/`Box` churn), so this follows the teacher's general
//! concurrency idiom instead — a `parking_lot::Mutex`-guarded shared
//! state, the same discipline `bass-ptp`'s `Arc<Mutex<PtpSharedState>>`
//! uses for cross-thread object sharing — applied to a geometrically
//! growing slab of fixed-size slots.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{Status, StatusResult};

struct Inner {
    slot_bytes: usize,
    min_slab_bytes: usize,
    max_slab_bytes: usize,
    free_list: Vec<Vec<u8>>,
    total_slabs_bytes: usize,
    poison_on_free: bool,
}

/// Allocates and recycles fixed-size byte slots. Slabs grow
/// geometrically between `min_slab_bytes` and `max_slab_bytes`; beyond
/// the max, allocation fails with `Status::NoMem` rather than growing
/// further, giving callers a deterministic backpressure signal.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<Mutex<Inner>>,
}

/// A slot checked out of a `Pool`. Returns its buffer to the pool's free
/// list on drop, so callers never forget to `deallocate`.
pub struct PoolSlot {
    pool: Pool,
    buf: Option<Vec<u8>>,
}

impl Pool {
    pub fn new(slot_bytes: usize, min_slab_bytes: usize, max_slab_bytes: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                slot_bytes,
                min_slab_bytes: min_slab_bytes.max(slot_bytes),
                max_slab_bytes: max_slab_bytes.max(slot_bytes),
                free_list: Vec::new(),
                total_slabs_bytes: 0,
                poison_on_free: cfg!(debug_assertions),
            })),
        }
    }

    pub fn allocate(&self) -> StatusResult<PoolSlot> {
        let mut inner = self.inner.lock();
        if let Some(buf) = inner.free_list.pop() {
            return Ok(PoolSlot { pool: self.clone(), buf: Some(buf) });
        }

        if inner.total_slabs_bytes >= inner.max_slab_bytes {
            return Err(Status::NoMem("pool exhausted max slab bytes"));
        }

        // Grow geometrically: double the last slab size, clamped to the
        // configured bounds, then carve it into slot-sized buffers.
        let next_slab_bytes = if inner.total_slabs_bytes == 0 {
            inner.min_slab_bytes
        } else {
            (inner.total_slabs_bytes * 2).min(inner.max_slab_bytes)
        };
        let grown_bytes = next_slab_bytes.saturating_sub(inner.total_slabs_bytes);
        let n_slots = (grown_bytes / inner.slot_bytes).max(1);

        let slot_bytes = inner.slot_bytes;
        for _ in 0..n_slots {
            inner.free_list.push(vec![0u8; slot_bytes]);
        }
        inner.total_slabs_bytes = next_slab_bytes;

        let buf = inner.free_list.pop().expect("just pushed at least one slot");
        Ok(PoolSlot { pool: self.clone(), buf: Some(buf) })
    }

    fn deallocate(&self, mut buf: Vec<u8>) {
        let mut inner = self.inner.lock();
        if inner.poison_on_free {
            buf.iter_mut().for_each(|b| *b = 0xAA);
        }
        inner.free_list.push(buf);
    }
}

impl PoolSlot {
    pub fn bytes(&self) -> &[u8] {
        self.buf.as_deref().expect("slot buffer present until drop")
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().expect("slot buffer present until drop")
    }
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.deallocate(buf);
        }
    }
}
