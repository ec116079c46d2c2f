//! Core domain types for hotmark.
//!
//! This module contains the configuration, error taxonomy and the
//! fundamental monitor point types shared by the registry, the engine
//! and the reporting surface.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, RegistryConfig};
pub use error::{MonitorError, Result};
pub use types::{Isolation, MonitorHandle, MonitorResult, PointName};
