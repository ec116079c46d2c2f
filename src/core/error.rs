use thiserror::Error;

/// Errors reported by the monitor engine and its outer layers.
///
/// Hot-path operations (`start`, `end`) never produce these: every failure
/// there degrades to a silent no-op. Administrative operations surface them
/// synchronously to the caller.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("monitor slots are full: capacity {capacity}")]
    CapacityExceeded {
        /// The registry's fixed point-count ceiling.
        capacity: usize,
    },

    #[error("monitor point already exists: {0}")]
    DuplicateName(String),

    #[error("monitor point not found: {0}")]
    NotFound(String),

    #[error("monitor point name must not be empty")]
    InvalidName,

    #[error("failed to allocate {what}")]
    AllocationFailure {
        /// What could not be reserved (e.g. "monitor", "result memory").
        what: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for hotmark operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an allocation failure for the given resource.
    pub fn alloc(what: &'static str) -> Self {
        Self::AllocationFailure { what }
    }

    /// True if the error is one of the benign admin races (`NotFound`,
    /// `DuplicateName`) that callers are expected to tolerate.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::DuplicateName(_))
    }
}
