//! Core Domain Types

pub mod error;

pub use error::{ErrorCategory, LensError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Tree Entries
// =============================================================================

/// Kind of a discovered tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One file or directory node discovered during a workspace scan.
///
/// Entries are produced in pre-order, directories before files,
/// lexicographic within kind. Never mutated after creation; the whole
/// list is rebuilt on every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File or directory name (final path component)
    pub name: String,
    /// Workspace-relative path, `/`-separated
    pub path: String,
    pub kind: EntryKind,
    /// Nesting depth below the workspace root (root children are 0)
    pub depth: usize,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

// =============================================================================
// Analysis Types
// =============================================================================

/// Structured extraction produced by Stage 1 (or its fallback)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredAnalysis {
    /// Prose description of the codebase
    #[serde(default)]
    pub description: String,
    /// Detected feature/technology names, ordered
    #[serde(default)]
    pub features: Vec<String>,
}

impl StructuredAnalysis {
    pub fn new(description: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            description: description.into(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty() && self.features.is_empty()
    }
}

/// Final output of one pipeline invocation. Transient; never persisted
/// (Stage 2 output is intentionally not cached).
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Polished markdown from Stage 2 (or the local fallback)
    pub markdown: String,
    /// Feature list carried from Stage 1
    pub features: Vec<String>,
    /// Whether Stage 1 was served from the cache
    pub from_cache: bool,
}

// =============================================================================
// Domain Newtypes
// =============================================================================

/// Digest of the formatted directory listing, used as the cache validity key.
///
/// Prevents accidental mixing of content hashes with other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodebaseHash(String);

impl CodebaseHash {
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CodebaseHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CodebaseHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for CodebaseHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
