//! Monitor points and their per-worker counter blocks.
//!
//! Each point owns one [`CounterBlock`] per worker slot, allocated once and
//! never resized. A block is mutated only by the thread owning its slot, so
//! updates are relaxed atomics on a private cache line: no locks, no
//! cross-worker write traffic. The aggregator only ever reads.

use crate::core::error::{MonitorError, Result};
use crate::core::types::PointName;
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-worker cost counters for one monitor point.
///
/// `start == 0` means "not currently timing". A reset publishes a fresh
/// generation whose blocks are all zero, which is exactly what makes an
/// `end` that straddles the reset a safe no-op.
#[derive(Debug, Default)]
pub struct CounterBlock {
    start: AtomicU64,
    cost: AtomicU64,
    overflow: AtomicU64,
    call_times: AtomicU64,
}

impl CounterBlock {
    /// Record the opening timestamp of an interval.
    #[inline(always)]
    pub fn begin(&self, now: u64) {
        self.start.store(now, Ordering::Relaxed);
    }

    /// Close the interval opened by [`begin`](Self::begin).
    ///
    /// Consumes the in-flight start; if there is none (no matching begin,
    /// or the registry was reset mid-flight) this is a no-op. Wrap of the
    /// accumulated cost is counted, never clamped.
    #[inline(always)]
    pub fn finish(&self, now: u64) {
        let start = self.start.swap(0, Ordering::Relaxed);
        if start == 0 {
            return;
        }

        let delta = now.wrapping_sub(start);
        let prev = self.cost.fetch_add(delta, Ordering::Relaxed);
        if prev.wrapping_add(delta) < prev {
            self.overflow.fetch_add(1, Ordering::Relaxed);
        }
        self.call_times.fetch_add(1, Ordering::Relaxed);
    }

    /// Read `(cost, overflow, call_times)` for aggregation.
    pub fn totals(&self) -> (u64, u64, u64) {
        (
            self.cost.load(Ordering::Relaxed),
            self.overflow.load(Ordering::Relaxed),
            self.call_times.load(Ordering::Relaxed),
        )
    }
}

/// A named monitor point owning one counter block per worker slot.
#[derive(Debug)]
pub struct MonitorPoint {
    name: PointName,
    hash: u64,
    blocks: Box<[CachePadded<CounterBlock>]>,
}

impl MonitorPoint {
    /// Allocate a point with zeroed counters for every worker slot.
    ///
    /// Reservation is fallible so that a registry rebuild under memory
    /// pressure surfaces `AllocationFailure` instead of aborting, leaving
    /// the active generation untouched.
    pub fn try_alloc(name: PointName, hash: u64, workers: usize) -> Result<Self> {
        let mut blocks = Vec::new();
        blocks
            .try_reserve_exact(workers)
            .map_err(|_| MonitorError::alloc("monitor point counters"))?;
        blocks.resize_with(workers, || CachePadded::new(CounterBlock::default()));

        Ok(Self {
            name,
            hash,
            blocks: blocks.into_boxed_slice(),
        })
    }

    /// The point's (possibly truncated) name.
    pub fn name(&self) -> &PointName {
        &self.name
    }

    #[inline]
    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }

    /// The counter block owned by `worker`. Slots wrap by residue so a
    /// worker id beyond the allocated count still lands on a valid block.
    #[inline(always)]
    pub fn block(&self, worker: usize) -> &CounterBlock {
        &self.blocks[worker % self.blocks.len()]
    }

    /// Iterate all worker blocks (aggregation only).
    pub fn blocks(&self) -> impl Iterator<Item = &CounterBlock> {
        self.blocks.iter().map(|padded| &**padded)
    }

    /// Number of worker slots this point was allocated with.
    pub fn workers(&self) -> usize {
        self.blocks.len()
    }
}

/// Lowest-free-slot pool mapping OS threads to worker ids.
///
/// The userspace analogue of per-CPU data indexed by `smp_processor_id()`:
/// each thread claims the lowest free slot on first use of the timing API
/// and releases it at thread exit, so concurrently live timing threads get
/// disjoint counter blocks as long as the per-point slot count covers
/// them. Threads beyond that share blocks by residue: degraded but still
/// well-defined, the same way a migrated kernel context is.
#[derive(Debug, Default)]
struct SlotPool {
    free: Vec<usize>,
    next: usize,
}

impl SlotPool {
    fn claim(&mut self) -> usize {
        let lowest = self
            .free
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| **slot)
            .map(|(pos, _)| pos);
        match lowest {
            Some(pos) => self.free.swap_remove(pos),
            None => {
                let slot = self.next;
                self.next += 1;
                slot
            },
        }
    }

    fn release(&mut self, slot: usize) {
        self.free.push(slot);
    }
}

static SLOT_POOL: Mutex<SlotPool> = Mutex::new(SlotPool {
    free: Vec::new(),
    next: 0,
});

struct WorkerSlot {
    id: usize,
}

impl WorkerSlot {
    fn claim() -> Self {
        Self {
            id: SLOT_POOL.lock().claim(),
        }
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        SLOT_POOL.lock().release(self.id);
    }
}

thread_local! {
    static WORKER: WorkerSlot = WorkerSlot::claim();
}

/// The calling thread's worker slot id.
#[inline]
pub fn current_worker() -> usize {
    WORKER.with(|slot| slot.id)
}

/// Default worker slot count: one per available CPU.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::hash_name;

    fn point(name: &str, workers: usize) -> MonitorPoint {
        let name = PointName::new(name);
        let hash = hash_name(&name);
        MonitorPoint::try_alloc(name, hash, workers).expect("alloc")
    }

    #[test]
    fn begin_finish_accumulates_once() {
        let block = CounterBlock::default();
        block.begin(100);
        block.finish(150);

        assert_eq!(block.totals(), (50, 0, 1));
    }

    #[test]
    fn finish_without_begin_is_a_noop() {
        let block = CounterBlock::default();
        block.finish(500);
        assert_eq!(block.totals(), (0, 0, 0));

        // A consumed start does not fire twice either.
        block.begin(10);
        block.finish(20);
        block.finish(30);
        assert_eq!(block.totals(), (10, 0, 1));
    }

    #[test]
    fn cost_wrap_is_counted_not_clamped() {
        let block = CounterBlock::default();
        block.begin(100);
        block.finish(150);

        // A wrapping counter read: now < start produces a huge delta that
        // wraps the accumulated cost below its previous value.
        block.begin(1);
        block.finish(0);

        let (cost, overflow, call_times) = block.totals();
        assert_eq!(overflow, 1);
        assert_eq!(call_times, 2);
        assert_eq!(cost, 49);
    }

    #[test]
    fn blocks_are_per_worker() {
        let point = point("per_worker", 4);
        point.block(0).begin(10);
        point.block(0).finish(30);
        point.block(3).begin(5);
        point.block(3).finish(10);

        assert_eq!(point.block(0).totals(), (20, 0, 1));
        assert_eq!(point.block(3).totals(), (5, 0, 1));
        assert_eq!(point.block(1).totals(), (0, 0, 0));
    }

    #[test]
    fn worker_index_wraps_by_residue() {
        let point = point("wrap", 2);
        point.block(5).begin(3);
        point.block(5).finish(10);
        assert_eq!(point.block(1).totals(), (7, 0, 1));
    }

    #[test]
    fn live_threads_hold_distinct_slots() {
        let ids: Vec<usize> = {
            let barrier = std::sync::Arc::new(std::sync::Barrier::new(4));
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let barrier = std::sync::Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        let id = current_worker();
                        barrier.wait();
                        id
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("join")).collect()
        };

        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }
}
