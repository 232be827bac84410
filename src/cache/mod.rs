//! Analysis Cache Store
//!
//! Persists a single JSON record keyed by a content hash of the formatted
//! directory tree, so repeated runs against an unchanged codebase skip the
//! expensive Stage 1 extraction.
//!
//! The record is all-or-nothing: no schema versioning, no partial
//! migration. Any shape mismatch, malformed JSON, or hash mismatch is
//! equivalent to cache absence and never surfaces as an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::constants::cache::CACHE_FILE_NAME;
use crate::types::{CodebaseHash, Result};

/// The persisted cache record. Field names are part of the on-disk
/// contract; consumers treat any other shape as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    /// Hash of the formatted tree this record was computed for
    pub codebase_hash: CodebaseHash,
    /// Stage 1 extraction, itself JSON-encoded
    pub detailed_analysis: String,
    /// Detected features, ordered
    #[serde(default)]
    pub features: Vec<String>,
    /// Snapshots of files the model read via tool calls
    #[serde(default)]
    pub file_contents: BTreeMap<String, String>,
    /// Record creation time (ISO-8601)
    pub timestamp: DateTime<Utc>,
}

/// Single-key cache repository over one workspace-relative record file.
///
/// Only one workspace's record is ever relevant at a time; this is
/// deliberately not a multi-entry store.
pub struct AnalysisCache {
    /// Resolved workspace root; `None` disables persistence entirely
    root: Option<PathBuf>,
    file_name: String,
}

impl AnalysisCache {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            file_name: CACHE_FILE_NAME.to_string(),
        }
    }

    pub fn for_workspace<P: AsRef<Path>>(root: P) -> Self {
        Self::new(Some(root.as_ref().to_path_buf()))
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn record_path(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|r| r.join(&self.file_name))
    }

    /// Content hash of a formatted tree. Line endings are normalized and
    /// the text trimmed first, so only structural content affects cache
    /// validity.
    pub fn hash(formatted_tree: &str) -> CodebaseHash {
        let normalized = formatted_tree.replace("\r\n", "\n");
        let digest = Sha256::digest(normalized.trim().as_bytes());
        CodebaseHash::new(format!("{:x}", digest))
    }

    /// Load the record if it exists and is valid for `current_hash`.
    ///
    /// Missing file, malformed JSON, missing analysis field, and hash
    /// mismatch all return `None`; this never errors to the caller.
    pub async fn load(&self, current_hash: &CodebaseHash) -> Option<CacheRecord> {
        let path = self.record_path()?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                debug!("Cache file unreadable, treating as absent: {}", e);
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!("Malformed cache record, treating as absent: {}", e);
                return None;
            }
        };

        if record.detailed_analysis.trim().is_empty() {
            warn!("Cache record has no analysis, treating as absent");
            return None;
        }

        if &record.codebase_hash != current_hash {
            info!(
                "Cache stale (recorded {}, current {}), invalidating",
                record.codebase_hash, current_hash
            );
            return None;
        }

        debug!("Cache hit for {}", current_hash);
        Some(record)
    }

    /// Persist a fresh record, replacing any previous one wholesale.
    ///
    /// Without a resolvable workspace root this is a logged no-op:
    /// caching is an optimization, not a correctness requirement.
    pub async fn save(
        &self,
        hash: CodebaseHash,
        detailed_analysis: String,
        features: Vec<String>,
        file_contents: BTreeMap<String, String>,
    ) -> Result<()> {
        let Some(path) = self.record_path() else {
            info!("No workspace root resolved, skipping cache save");
            return Ok(());
        };

        // A save is an idempotent function of (hash, analysis): rewriting
        // an identical record would only churn the timestamp.
        if let Some(existing) = self.peek().await
            && existing.codebase_hash == hash
            && existing.detailed_analysis == detailed_analysis
            && existing.features == features
            && existing.file_contents == file_contents
        {
            debug!("Cache record unchanged, skipping rewrite");
            return Ok(());
        }

        let record = CacheRecord {
            codebase_hash: hash,
            detailed_analysis,
            features,
            file_contents,
            timestamp: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(&path, &content).await?;
        info!("Saved analysis cache ({} bytes) to {}", content.len(), path.display());
        Ok(())
    }

    /// Delete the record file. Absence is not an error.
    pub async fn clear(&self) -> Result<bool> {
        let Some(path) = self.record_path() else {
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Cleared analysis cache at {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Record metadata for status reporting, if a record exists at all
    /// (regardless of hash validity)
    pub async fn peek(&self) -> Option<CacheRecord> {
        let path = self.record_path()?;
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        serde_json::from_str(&content).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_args() -> (CodebaseHash, String, Vec<String>, BTreeMap<String, String>) {
        (
            AnalysisCache::hash("project/\n└── src/\n"),
            r#"{"description":"a project"}"#.to_string(),
            vec!["Rust".to_string()],
            BTreeMap::from([("src/main.rs".to_string(), "fn main() {}".to_string())]),
        )
    }

    #[test]
    fn test_hash_normalizes_line_endings() {
        let unix = AnalysisCache::hash("a/\n└── b");
        let dos = AnalysisCache::hash("a/\r\n└── b\r\n");
        let edge_padded = AnalysisCache::hash("\n  a/\n└── b  \n");
        assert_eq!(unix, dos);
        // Outer whitespace is trimmed away before hashing
        assert_eq!(unix, edge_padded);
        // Interior whitespace still changes the digest
        let interior = AnalysisCache::hash("a/\n└──  b");
        assert_ne!(unix, interior);
    }

    #[test]
    fn test_hash_sensitive_to_structure() {
        let a = AnalysisCache::hash("p/\n└── src/\n");
        let b = AnalysisCache::hash("p/\n└── lib/\n");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let cache = AnalysisCache::for_workspace(tmp.path());
        let (hash, analysis, features, files) = sample_args();

        cache
            .save(hash.clone(), analysis.clone(), features.clone(), files)
            .await
            .unwrap();

        let record = cache.load(&hash).await.expect("record should be valid");
        assert_eq!(record.detailed_analysis, analysis);
        assert_eq!(record.features, features);
        assert_eq!(record.file_contents["src/main.rs"], "fn main() {}");
    }

    #[tokio::test]
    async fn test_stale_hash_is_absent() {
        let tmp = TempDir::new().unwrap();
        let cache = AnalysisCache::for_workspace(tmp.path());
        let (hash, analysis, features, files) = sample_args();
        cache.save(hash, analysis, features, files).await.unwrap();

        let other = AnalysisCache::hash("entirely different tree");
        assert!(cache.load(&other).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_record_is_absent() {
        let tmp = TempDir::new().unwrap();
        let cache = AnalysisCache::for_workspace(tmp.path());
        std::fs::write(tmp.path().join(CACHE_FILE_NAME), "{not json").unwrap();

        let hash = AnalysisCache::hash("anything");
        assert!(cache.load(&hash).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_analysis_field_is_absent() {
        let tmp = TempDir::new().unwrap();
        let cache = AnalysisCache::for_workspace(tmp.path());
        let hash = AnalysisCache::hash("t");
        std::fs::write(
            tmp.path().join(CACHE_FILE_NAME),
            format!(
                r#"{{"codebaseHash":"{}","features":[],"timestamp":"2026-01-01T00:00:00Z"}}"#,
                hash
            ),
        )
        .unwrap();

        assert!(cache.load(&hash).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_absent_is_ok() {
        let tmp = TempDir::new().unwrap();
        let cache = AnalysisCache::for_workspace(tmp.path());
        assert!(!cache.clear().await.unwrap());
    }

    #[tokio::test]
    async fn test_no_root_save_is_noop() {
        let cache = AnalysisCache::new(None);
        let (hash, analysis, features, files) = sample_args();
        cache.save(hash.clone(), analysis, features, files).await.unwrap();
        assert!(cache.load(&hash).await.is_none());
    }

    #[tokio::test]
    async fn test_idempotent_save_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let cache = AnalysisCache::for_workspace(tmp.path());
        let path = tmp.path().join(CACHE_FILE_NAME);
        let (hash, analysis, features, files) = sample_args();

        cache
            .save(hash.clone(), analysis.clone(), features.clone(), files.clone())
            .await
            .unwrap();
        let first = std::fs::read(&path).unwrap();

        cache.save(hash, analysis, features, files).await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }
}
