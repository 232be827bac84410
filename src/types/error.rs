//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Error Taxonomy
//!
//! - **Filesystem**: unreadable directory, missing cache file - recovered
//!   locally, degrades to "skip" or "absent"
//! - **Remote-call**: network/API failure - recovered via the local
//!   heuristic fallback, logged but not re-thrown
//! - **Malformed-response**: invalid JSON, empty content - recovered via
//!   the layered response resolver
//! - **Cache-shape**: missing field, hash mismatch - treated as cache-absent
//!
//! The only condition that propagates to the caller as a user-visible
//! failure is a completely unreadable workspace root.

use std::time::Duration;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, LensError>;

/// Unified error type for the analysis pipeline
#[derive(Debug, Error)]
pub enum LensError {
    /// Filesystem I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote completion service failure (network, HTTP, API shape)
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// A remote call exceeded its deadline
    #[error("Operation '{operation}' timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    /// The workspace root itself could not be read.
    /// This is the single error allowed to surface to the user.
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Cache record could not be written
    #[error("Cache error: {0}")]
    Cache(String),

    /// JSON serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LensError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Coarse category for logging and fallback routing
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) | Self::Workspace(_) => ErrorCategory::Filesystem,
            Self::LlmApi(_) | Self::Timeout { .. } => ErrorCategory::Remote,
            Self::Json(_) => ErrorCategory::MalformedResponse,
            Self::Cache(_) => ErrorCategory::CacheShape,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether the pipeline should recover through the local heuristic
    /// fallback rather than surfacing this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Workspace(_) | Self::Config(_))
    }
}

/// Error categories mirroring the pipeline's recovery taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Skip or treat as absent, never surfaced
    Filesystem,
    /// Recovered via the local heuristic fallback
    Remote,
    /// Recovered via resolver fallbacks
    MalformedResponse,
    /// Treated as cache-absent
    CacheShape,
    /// Fail fast, fix configuration
    Config,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filesystem => write!(f, "FILESYSTEM"),
            Self::Remote => write!(f, "REMOTE"),
            Self::MalformedResponse => write!(f, "MALFORMED_RESPONSE"),
            Self::CacheShape => write!(f, "CACHE_SHAPE"),
            Self::Config => write!(f, "CONFIG"),
        }
    }
}
