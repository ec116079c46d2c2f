//! hotmark - in-process hot-path instrumentation.
//!
//! hotmark lets an application mark arbitrary code regions with named
//! monitor points and accumulates per-region elapsed-cycle cost and call
//! counts across concurrently executing workers, then serves a ranked
//! report of the most expensive points on demand.
//!
//! # Features
//!
//! - **Lock-free timing path**: `start`/`end` never take a lock and never
//!   fail; safe to call from the hottest code in the process
//! - **Per-worker counters**: each execution context owns its counter
//!   cache lines, so timing calls never contend with each other
//! - **Atomic reset**: a copy-and-swap of the whole registry; readers
//!   never observe a half-reset generation
//! - **Ranked reports**: plain-text table over HTTP, worst points first
//! - **Raw cycles**: the hardware cycle counter is the unit of record,
//!   with wrap events counted rather than hidden
//!
//! # Architecture
//!
//! - `cycles`: hardware cycle counter reads
//! - `registry`: bucketed point set with per-worker counter blocks
//! - `engine`: timing API, swap-protocol reset, active generation pointer
//! - `report`: aggregation, ranking and table rendering
//! - `api`: HTTP report surface
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use hotmark::MonitorEngine;
//! use hotmark::core::RegistryConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MonitorEngine::new(&RegistryConfig::default())?;
//!     let handle = engine.add_point("checksum")?;
//!
//!     engine.start(&handle);
//!     // ... the region being measured ...
//!     engine.end(&handle);
//!
//!     print!("{}", engine.top_list()?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod api;
pub mod application;
pub mod cli;
pub mod core;
pub mod cycles;
pub mod engine;
pub mod registry;
pub mod report;

// Re-export the main surface for convenience
pub use crate::application::Application;
pub use crate::core::{Config, Isolation, MonitorError, MonitorHandle, MonitorResult, Result};
pub use crate::engine::{global, timed_call, MonitorEngine};
