//! Error types for dumpgraph-core

use thiserror::Error;

/// Which request argument slot failed validation.
///
/// Slots are 1-based, matching the order the caller supplied them:
/// `Content(2)` is the second content type of a multi-metric request,
/// `Subject(1)` is the first comparison member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSlot {
    /// A content-type argument (1-based position)
    Content(u8),
    /// A comparison-subject argument (1-based position)
    Subject(u8),
}

impl std::fmt::Display for ArgSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgSlot::Content(n) => write!(f, "content type #{}", n),
            ArgSlot::Subject(n) => write!(f, "subject #{}", n),
        }
    }
}

/// Main error type for the dumpgraph-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (fatal at startup, never per-request)
    #[error("configuration error: {0}")]
    Config(String),

    /// Request validation failed before any I/O was performed
    #[error("invalid {slot}: {value:?} is not a supported value")]
    Validation { slot: ArgSlot, value: String },

    /// Dump root vanished or became unreadable between startup and request time
    #[error("dump corpus unavailable at {}", root.display())]
    CorpusUnavailable { root: std::path::PathBuf },

    /// Overlay series does not line up with the base series' buckets
    #[error("series shape mismatch: base has {expected} buckets, overlay has {actual}")]
    SeriesShapeMismatch { expected: usize, actual: usize },

    /// Chart rendering failed
    #[error("render error: {0}")]
    Render(String),

    /// Tabular artifact could not be written or read back
    #[error("table error at {}: {message}", path.display())]
    Table {
        path: std::path::PathBuf,
        message: String,
    },

    /// Another pipeline run is already in flight
    #[error("another statistics request is already running, try again later")]
    GateDenied,

    /// Requester exceeded the per-user invocation budget
    #[error("rate limited, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Pipeline run exceeded the configured wall-clock bound
    #[error("request timed out after {limit_secs}s")]
    Timeout { limit_secs: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for outcomes the caller should surface as "try again later"
    /// rather than as a failure of the request itself.
    pub fn is_throttle(&self) -> bool {
        matches!(self, Error::GateDenied | Error::RateLimited { .. })
    }
}

/// Result type alias for dumpgraph-core
pub type Result<T> = std::result::Result<T, Error>;
