//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Tree scanning constants
pub mod scan {
    /// Hard recursion bound for the workspace walk.
    /// Subtrees deeper than this are silently omitted, not an error.
    pub const MAX_DEPTH: usize = 5;

    /// Progress callback interval (entries between milestone events)
    pub const PROGRESS_INTERVAL: usize = 50;

    /// Directories always skipped below the root, regardless of ignore-file
    /// contents. Keeps the scan fast even without a configured ignore file.
    pub const SKIP_DIRS: &[&str] = &[
        "node_modules",
        "target",
        ".git",
        "build",
        "dist",
        "__pycache__",
        "vendor",
        ".venv",
    ];

    /// Manifest files probed for Stage 1 context, in priority order
    pub const MANIFEST_FILES: &[&str] = &["package.json", "Cargo.toml", "pyproject.toml", "go.mod"];

    /// Maximum manifest size embedded into a prompt (bytes)
    pub const MAX_MANIFEST_BYTES: usize = 16 * 1024;
}

/// Cache constants
pub mod cache {
    /// Single-record analysis cache file, workspace-relative
    pub const CACHE_FILE_NAME: &str = ".repolens-analysis.json";
}

/// Stage 1 tool-loop constants
pub mod stage_one {
    /// Iteration ceiling for tool-call rounds
    pub const MAX_TOOL_ROUNDS: usize = 3;

    /// A free-text reply shorter than this with no JSON braces is treated
    /// as "too brief" and re-prompted instead of accepted
    pub const BRIEF_REPLY_CHARS: usize = 200;
}

/// File-reader tool constants
pub mod tools {
    /// Maximum file content returned to the model (bytes); longer files
    /// are truncated with a note
    pub const MAX_TOOL_FILE_BYTES: usize = 64 * 1024;

    /// Bytes sniffed for binary detection
    pub const BINARY_SNIFF_BYTES: usize = 8 * 1024;
}

/// HTTP/Network constants
pub mod network {
    /// Default completion request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
}
