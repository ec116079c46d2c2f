//! The monitor engine: active registry generation, hot-path timing API and
//! the copy-and-swap reset protocol.
//!
//! The engine owns exactly one live [`Registry`] generation behind an
//! atomic pointer. Timing calls resolve against whatever generation is
//! published at that instant and never block on structural changes.
//! Administrative operations (add, remove, reset) are serialized by a
//! single engine-level lock: they only need to be correct under
//! concurrency, not fast.

use crate::core::config::RegistryConfig;
use crate::core::error::Result;
use crate::core::types::{Isolation, MonitorHandle, MonitorResult, PointName};
use crate::cycles;
use crate::registry::{current_worker, default_workers, Registry};
use crate::report;
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-scoped instrumentation engine.
///
/// Construct one explicitly for testable units, or use [`global`] for
/// drop-in instrumentation of an application.
#[derive(Debug)]
pub struct MonitorEngine {
    active: ArcSwap<Registry>,
    admin: Mutex<()>,
    monitor_pid: AtomicU64,
    buckets: usize,
    capacity: usize,
    workers: usize,
}

impl MonitorEngine {
    /// Build an engine with an empty registry generation.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let workers = if config.workers == 0 {
            default_workers()
        } else {
            config.workers
        };
        let registry = Registry::try_new(config.buckets, config.max_points, workers)?;

        Ok(Self {
            active: ArcSwap::from_pointee(registry),
            admin: Mutex::new(()),
            monitor_pid: AtomicU64::new(config.monitor_pid),
            buckets: config.buckets,
            capacity: config.max_points,
            workers,
        })
    }

    /// Register a monitor point, returning the handle timing calls use.
    ///
    /// Fails with `CapacityExceeded` at the registry ceiling and
    /// `DuplicateName` if the (possibly truncated) name already exists.
    pub fn add_point(&self, name: &str) -> Result<MonitorHandle> {
        let handle = MonitorHandle::new(name);
        let _admin = self.admin.lock();

        match self.active.load().insert(handle.name()) {
            Ok(()) => {
                tracing::debug!(point = %handle.name(), "monitor point registered");
                Ok(handle)
            },
            Err(err) => {
                tracing::error!(point = %handle.name(), %err, "failed to register monitor point");
                Err(err)
            },
        }
    }

    /// Unregister a monitor point.
    ///
    /// Removing a point that does not exist (or was already removed)
    /// mutates nothing and reports `NotFound`; callers treat this as a
    /// benign race.
    pub fn remove_point(&self, name: &str) -> Result<()> {
        let name = PointName::new(name);
        let _admin = self.admin.lock();

        match self.active.load().remove(&name) {
            Ok(()) => {
                tracing::debug!(point = %name, "monitor point removed");
                Ok(())
            },
            Err(err) => {
                tracing::warn!(point = %name, %err, "remove of absent monitor point");
                Err(err)
            },
        }
    }

    /// Open a timing interval for the calling worker.
    ///
    /// Never blocks and never fails: an unknown handle is a silent no-op.
    /// The cycle counter is read after the point is resolved so the
    /// measured window starts as late as possible.
    #[inline]
    pub fn start(&self, handle: &MonitorHandle) {
        let registry = self.active.load();
        registry.with_point(handle, |point| {
            point.block(current_worker()).begin(cycles::now());
        });
    }

    /// Close the timing interval opened by [`start`](Self::start).
    ///
    /// The cycle counter is read before the point is resolved so the
    /// resolve overhead does not inflate the measured interval. With no
    /// matching start on this worker (or after a reset swapped in a fresh
    /// generation mid-flight) this is a silent no-op.
    #[inline]
    pub fn end(&self, handle: &MonitorHandle) {
        let now = cycles::now();
        let registry = self.active.load();
        registry.with_point(handle, |point| {
            point.block(current_worker()).finish(now);
        });
    }

    /// Reset all counters via the swap protocol.
    ///
    /// Builds a fresh generation carrying every live point name with
    /// zeroed counters, publishes it in one atomic store, and leaves the
    /// superseded generation to be reclaimed once its last in-flight
    /// reader drains. On allocation failure the active generation is
    /// untouched.
    pub fn reset(&self) -> Result<()> {
        let _admin = self.admin.lock();

        let old = self.active.load_full();
        let fresh = Registry::try_new(self.buckets, self.capacity, self.workers)?;
        for name in old.point_names() {
            fresh.insert(&name)?;
        }

        self.active.store(Arc::new(fresh));
        tracing::debug!(points = old.live(), "monitor stats reset");
        Ok(())
    }

    /// Aggregate every live point's counters across all workers.
    pub fn snapshot(&self) -> Result<Vec<MonitorResult>> {
        report::snapshot(&self.active.load())
    }

    /// The ranked plain-text report table.
    pub fn top_list(&self) -> Result<String> {
        let mut results = self.snapshot()?;
        report::rank(&mut results);
        Ok(report::render(&results))
    }

    /// Number of currently registered points.
    pub fn live_points(&self) -> usize {
        self.active.load().live()
    }

    /// Worker counter slots allocated per point.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The uninterpreted `monitor_pid` value.
    pub fn monitor_pid(&self) -> u64 {
        self.monitor_pid.load(Ordering::Relaxed)
    }

    /// Store a new `monitor_pid` value. The core does not interpret it.
    pub fn set_monitor_pid(&self, pid: u64) {
        self.monitor_pid.store(pid, Ordering::Relaxed);
        tracing::info!("The monitor pid is updated to {}", pid);
    }
}

/// Measure one invocation of `f` end-to-end, independent of the registry.
///
/// The elapsed cycle count goes to the logging side channel and is also
/// returned with `f`'s output. `isolation` requests a
/// preemption/interrupt-free window around the call; userspace cannot
/// grant that, so non-[`Isolation::None`] levels are advisory.
pub fn timed_call<R>(name: &str, isolation: Isolation, f: impl FnOnce() -> R) -> (R, u64) {
    if isolation != Isolation::None {
        tracing::debug!(?isolation, "isolation level is advisory in userspace");
    }

    let start = cycles::now();
    let output = f();
    let end = cycles::now();

    let cost = end.wrapping_sub(start);
    tracing::info!("{} costs {} cycles", name, cost);
    (output, cost)
}

static GLOBAL: Lazy<MonitorEngine> = Lazy::new(|| {
    MonitorEngine::new(&RegistryConfig::default()).expect("default monitor engine")
});

/// The process-wide default engine.
pub fn global() -> &'static MonitorEngine {
    &GLOBAL
}
