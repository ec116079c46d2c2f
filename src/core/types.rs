//! Domain types for monitor points: names, handles and report rows.

use rustc_hash::FxHasher;
use std::fmt;
use std::hash::Hasher;

/// Total storage for a point name, mirroring the fixed 32-byte field of
/// classic kernel profilers (31 bytes of payload plus a terminator slot).
pub const POINT_NAME_SIZE: usize = 32;

const POINT_NAME_MAX: usize = POINT_NAME_SIZE - 1;

/// A fixed-capacity, inline monitor point name.
///
/// Longer input is silently truncated to 31 bytes at a UTF-8 character
/// boundary. Truncation is documented behavior, not an error: two names
/// that collide after truncation are treated as the same point, and the
/// second registration fails with `DuplicateName`.
///
/// The empty name is the free/absent sentinel and never names a live point.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointName {
    bytes: [u8; POINT_NAME_SIZE],
    len: u8,
}

impl PointName {
    /// Builds a name from `s`, truncating to the fixed capacity.
    pub fn new(s: &str) -> Self {
        let mut end = s.len().min(POINT_NAME_MAX);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; POINT_NAME_SIZE];
        bytes[..end].copy_from_slice(&s.as_bytes()[..end]);
        Self {
            bytes,
            len: end as u8,
        }
    }

    /// The empty sentinel name.
    pub const fn empty() -> Self {
        Self {
            bytes: [0u8; POINT_NAME_SIZE],
            len: 0,
        }
    }

    /// Name payload as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction only ever copies up to a char boundary.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    /// Raw payload bytes (without the unused tail).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// True for the free/absent sentinel.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for PointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for PointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointName({:?})", self.as_str())
    }
}

impl From<&str> for PointName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Hashes a point name for bucket selection and fast handle comparison.
pub(crate) fn hash_name(name: &PointName) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish()
}

/// A cheap `Copy` key for a monitor point.
///
/// A handle is name-keyed: it never pins a registry generation and is
/// re-resolved against the currently published generation on every timing
/// call. A handle taken before a reset therefore lands on the new, zeroed
/// point afterward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitorHandle {
    name: PointName,
    hash: u64,
}

impl MonitorHandle {
    /// Builds a handle for `name` (truncated to the fixed capacity).
    pub fn new(name: &str) -> Self {
        let name = PointName::new(name);
        let hash = hash_name(&name);
        Self { name, hash }
    }

    /// The (possibly truncated) point name this handle resolves.
    pub fn name(&self) -> &PointName {
        &self.name
    }

    #[inline]
    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }
}

/// One aggregated report row: a point's counters summed across all workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorResult {
    /// Point name (empty only for tombstoned slots, which rank last).
    pub name: PointName,
    /// Completed start/end pairs across all workers.
    pub call_times: u64,
    /// Detected wrap events, per-worker plus cross-worker summation.
    pub overflow: u64,
    /// Total accumulated cycle cost across all workers.
    pub cost: u64,
    /// `cost / call_times`, computed once after full summation.
    pub average: u64,
}

/// Isolation level for a one-shot `timed_call` measurement window.
///
/// In the kernel these suppress preemption, soft interrupts or hard
/// interrupts around the measured call. A userspace build cannot suppress
/// any of them; the non-`None` variants are accepted for call-site parity
/// and are advisory only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Isolation {
    /// Plain measurement, no suppression requested.
    #[default]
    None,
    /// Request a preemption-free window.
    Preemption,
    /// Request a soft-interrupt-free window.
    SoftIrq,
    /// Request a hard-interrupt-free window.
    HardIrq,
}
