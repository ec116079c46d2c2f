//! Bucketed monitor registry with lock-free reads.
//!
//! Points are partitioned into a power-of-two number of buckets keyed by a
//! hash of the name. Each bucket pairs a write lock (structural mutation
//! only) with an atomically swappable, immutable point list. Readers load
//! the current list without taking any lock; writers clone the list, edit
//! the clone under the bucket lock and publish it in one atomic store.
//!
//! Physical reclamation of an unlinked point (or an entire superseded
//! generation) is deferred until the last reader drops its snapshot, which
//! is the grace-period guarantee the timing path relies on: a point a
//! reader is still dereferencing is never freed under it.

use crate::core::error::{MonitorError, Result};
use crate::core::types::{hash_name, MonitorHandle, PointName};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub mod point;

pub use point::{current_worker, default_workers, CounterBlock, MonitorPoint};

type PointList = Vec<Arc<MonitorPoint>>;

#[derive(Debug)]
struct Bucket {
    write_lock: Mutex<()>,
    points: ArcSwap<PointList>,
}

/// One generation of the monitor registry.
///
/// A generation is live from the instant it is published as the active
/// registry until a newer generation replaces it; the swap protocol in the
/// engine never mutates counters in place across generations.
#[derive(Debug)]
pub struct Registry {
    buckets: Box<[Bucket]>,
    mask: u64,
    live: AtomicUsize,
    capacity: usize,
    workers: usize,
}

impl Registry {
    /// Allocate an empty registry.
    ///
    /// `buckets` is rounded up to a power of two. `capacity` is the fixed
    /// point-count ceiling. `workers` is the per-point counter slot count.
    pub fn try_new(buckets: usize, capacity: usize, workers: usize) -> Result<Self> {
        let bucket_count = buckets.max(1).next_power_of_two();
        let mut table = Vec::new();
        table
            .try_reserve_exact(bucket_count)
            .map_err(|_| MonitorError::alloc("monitor"))?;
        table.resize_with(bucket_count, || Bucket {
            write_lock: Mutex::new(()),
            points: ArcSwap::from_pointee(Vec::new()),
        });

        Ok(Self {
            buckets: table.into_boxed_slice(),
            mask: (bucket_count - 1) as u64,
            live: AtomicUsize::new(0),
            capacity,
            workers: workers.max(1),
        })
    }

    #[inline]
    fn bucket_for(&self, hash: u64) -> &Bucket {
        &self.buckets[(hash & self.mask) as usize]
    }

    /// Register a new point. Duplicates are rejected, not merged.
    pub fn insert(&self, name: &PointName) -> Result<()> {
        if name.is_empty() {
            return Err(MonitorError::InvalidName);
        }

        let hash = hash_name(name);
        let bucket = self.bucket_for(hash);
        let _guard = bucket.write_lock.lock();

        let current = bucket.points.load();
        if current.iter().any(|point| point.name() == name) {
            return Err(MonitorError::DuplicateName(name.as_str().to_string()));
        }
        if self.live.load(Ordering::Relaxed) >= self.capacity {
            return Err(MonitorError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let point = MonitorPoint::try_alloc(*name, hash, self.workers)?;

        let mut next = Vec::new();
        next.try_reserve_exact(current.len() + 1)
            .map_err(|_| MonitorError::alloc("monitor point list"))?;
        next.extend(current.iter().cloned());
        next.push(Arc::new(point));

        bucket.points.store(Arc::new(next));
        self.live.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Unlink a point from its bucket.
    ///
    /// The point's memory is reclaimed only after every concurrent reader
    /// of the old bucket list has finished with its snapshot. Removing a
    /// name that is not registered mutates nothing and reports `NotFound`.
    pub fn remove(&self, name: &PointName) -> Result<()> {
        let hash = hash_name(name);
        let bucket = self.bucket_for(hash);
        let _guard = bucket.write_lock.lock();

        let current = bucket.points.load();
        let position = current.iter().position(|point| point.name() == name);
        let Some(position) = position else {
            return Err(MonitorError::NotFound(name.as_str().to_string()));
        };

        let mut next = Vec::new();
        next.try_reserve_exact(current.len() - 1)
            .map_err(|_| MonitorError::alloc("monitor point list"))?;
        next.extend(
            current
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != position)
                .map(|(_, point)| Arc::clone(point)),
        );

        bucket.points.store(Arc::new(next));
        self.live.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    /// Resolve `handle` in this generation and run `f` against the point.
    ///
    /// Lock-free: loads the bucket's current snapshot and borrows the
    /// point from it for the duration of `f`. Returns `None` when the
    /// point is absent, which the timing path treats as a silent no-op.
    #[inline]
    pub fn with_point<R>(&self, handle: &MonitorHandle, f: impl FnOnce(&MonitorPoint) -> R) -> Option<R> {
        let bucket = self.bucket_for(handle.hash());
        let points = bucket.points.load();
        points
            .iter()
            .find(|point| point.hash() == handle.hash() && point.name() == handle.name())
            .map(|point| f(point))
    }

    /// Look up a point by name, cloning its handle out of the bucket.
    pub fn find(&self, name: &PointName) -> Option<Arc<MonitorPoint>> {
        let bucket = self.bucket_for(hash_name(name));
        let points = bucket.points.load();
        points
            .iter()
            .find(|point| point.name() == name)
            .map(Arc::clone)
    }

    /// Visit every live point. Lock-free full traversal; used by the
    /// aggregator and the swap protocol.
    pub fn for_each_point(&self, mut visitor: impl FnMut(&MonitorPoint)) {
        for bucket in self.buckets.iter() {
            let points = bucket.points.load();
            for point in points.iter() {
                visitor(point);
            }
        }
    }

    /// Names of every live point, in traversal order.
    pub fn point_names(&self) -> Vec<PointName> {
        let mut names = Vec::with_capacity(self.live());
        self.for_each_point(|point| names.push(*point.name()));
        names
    }

    /// Number of currently registered points.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// The fixed point-count ceiling.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Per-point worker slot count.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(capacity: usize) -> Registry {
        Registry::try_new(8, capacity, 4).expect("registry alloc")
    }

    #[test]
    fn insert_and_find() {
        let reg = registry(16);
        reg.insert(&PointName::new("rx_poll")).expect("insert");

        assert_eq!(reg.live(), 1);
        let point = reg.find(&PointName::new("rx_poll")).expect("find");
        assert_eq!(point.name().as_str(), "rx_poll");
        assert!(reg.find(&PointName::new("missing")).is_none());
    }

    #[test]
    fn duplicates_are_rejected_not_merged() {
        let reg = registry(16);
        let name = PointName::new("tx_xmit");
        reg.insert(&name).expect("first insert");

        // Accumulate something so we can verify the original survives.
        let point = reg.find(&name).expect("find");
        point.block(0).begin(10);
        point.block(0).finish(25);

        let err = reg.insert(&name).expect_err("duplicate");
        assert!(matches!(err, MonitorError::DuplicateName(_)));
        assert_eq!(reg.live(), 1);

        let point = reg.find(&name).expect("find again");
        assert_eq!(point.block(0).totals(), (15, 0, 1));
    }

    #[test]
    fn capacity_is_enforced() {
        let reg = registry(2);
        reg.insert(&PointName::new("a")).expect("a");
        reg.insert(&PointName::new("b")).expect("b");

        let err = reg.insert(&PointName::new("c")).expect_err("full");
        assert!(matches!(err, MonitorError::CapacityExceeded { capacity: 2 }));
        assert_eq!(reg.live(), 2);
    }

    #[test]
    fn empty_name_is_rejected() {
        let reg = registry(4);
        let err = reg.insert(&PointName::empty()).expect_err("empty");
        assert!(matches!(err, MonitorError::InvalidName));
    }

    #[test]
    fn remove_unlinks_and_reports_absence() {
        let reg = registry(16);
        let name = PointName::new("short_lived");
        reg.insert(&name).expect("insert");
        reg.remove(&name).expect("remove");

        assert_eq!(reg.live(), 0);
        assert!(reg.find(&name).is_none());

        let err = reg.remove(&name).expect_err("already removed");
        assert!(matches!(err, MonitorError::NotFound(_)));
    }

    #[test]
    fn removed_point_survives_for_holders() {
        let reg = registry(16);
        let name = PointName::new("held");
        reg.insert(&name).expect("insert");

        let held = reg.find(&name).expect("find");
        reg.remove(&name).expect("remove");

        // The unlinked point is still valid for anyone who grabbed it
        // before the unlink; reclamation happens after the last drop.
        held.block(0).begin(1);
        held.block(0).finish(3);
        assert_eq!(held.block(0).totals(), (2, 0, 1));
    }

    #[test]
    fn traversal_visits_every_live_point() {
        let reg = registry(16);
        for name in ["a", "b", "c", "d"] {
            reg.insert(&PointName::new(name)).expect("insert");
        }
        reg.remove(&PointName::new("b")).expect("remove");

        let mut seen = Vec::new();
        reg.for_each_point(|point| seen.push(point.name().as_str().to_string()));
        seen.sort();
        assert_eq!(seen, ["a", "c", "d"]);
    }

    #[test]
    fn with_point_resolves_by_handle() {
        let reg = registry(16);
        reg.insert(&PointName::new("handled")).expect("insert");

        let handle = MonitorHandle::new("handled");
        let hit = reg.with_point(&handle, |point| point.name().as_str().to_string());
        assert_eq!(hit.as_deref(), Some("handled"));

        let miss = reg.with_point(&MonitorHandle::new("absent"), |_| ());
        assert!(miss.is_none());
    }
}
