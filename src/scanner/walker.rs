//! Workspace Tree Scanner
//!
//! Depth-bounded recursive walk over the workspace root producing an
//! ordered list of [`TreeEntry`] values. Ordering is load-bearing: the
//! formatter's last-sibling detection and the cache content hash both
//! depend on directories-before-files, lexicographic-within-kind order.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::ignore_rules::IgnoreRules;
use crate::constants::scan;
use crate::types::{EntryKind, LensError, Result, TreeEntry};

/// Callback invoked with the running entry count at scanning milestones.
/// Purely informational; must never block the scan.
pub type ProgressFn = Arc<dyn Fn(usize) + Send + Sync>;

pub struct TreeScanner {
    root: PathBuf,
    rules: IgnoreRules,
    cache_file_name: String,
    max_depth: usize,
    progress: Option<ProgressFn>,
}

impl TreeScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            rules: IgnoreRules::default(),
            cache_file_name: crate::constants::cache::CACHE_FILE_NAME.to_string(),
            max_depth: scan::MAX_DEPTH,
            progress: None,
        }
    }

    /// Load ignore rules from a file under the root (missing file is fine)
    pub fn with_ignore_file(mut self, ignore_file: &str) -> Self {
        self.rules = IgnoreRules::from_workspace(&self.root, ignore_file);
        self
    }

    pub fn with_rules(mut self, rules: IgnoreRules) -> Self {
        self.rules = rules;
        self
    }

    /// Cache-record file excluded from every scan, so caching never
    /// perturbs its own invalidation hash
    pub fn with_cache_file_name(mut self, name: impl Into<String>) -> Self {
        self.cache_file_name = name.into();
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the workspace and return ordered entries.
    ///
    /// An unreadable root is the only fatal condition in the pipeline;
    /// unreadable subdirectories are logged and skipped, and an empty
    /// workspace yields an empty list.
    pub fn scan(&self) -> Result<Vec<TreeEntry>> {
        let read = fs::read_dir(&self.root).map_err(|e| {
            LensError::Workspace(format!(
                "cannot read workspace root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut entries = Vec::new();
        let children = self.collect_children(read, "");
        for child in children {
            self.push_entry(child, &mut entries);
        }

        debug!("Scanned {} entries under {}", entries.len(), self.root.display());
        Ok(entries)
    }

    fn push_entry(&self, entry: TreeEntry, out: &mut Vec<TreeEntry>) {
        let is_dir = entry.is_dir();
        let depth = entry.depth;
        let rel = entry.path.clone();
        out.push(entry);

        if let Some(progress) = &self.progress
            && out.len() % scan::PROGRESS_INTERVAL == 0
        {
            progress(out.len());
        }

        // Subtrees beyond the depth bound are silently omitted
        if !is_dir || depth + 1 > self.max_depth {
            return;
        }

        let dir_path = self.root.join(rel.replace('/', std::path::MAIN_SEPARATOR_STR));
        match fs::read_dir(&dir_path) {
            Ok(read) => {
                for child in self.collect_children(read, &rel) {
                    self.push_entry(child, out);
                }
            }
            Err(e) => {
                // Partial trees are acceptable
                warn!("Skipping unreadable directory {}: {}", dir_path.display(), e);
            }
        }
    }

    /// Read, filter, and order the children of one directory:
    /// directories first, then lexicographic by name.
    fn collect_children(&self, read: fs::ReadDir, rel_prefix: &str) -> Vec<TreeEntry> {
        let depth = if rel_prefix.is_empty() {
            0
        } else {
            rel_prefix.matches('/').count() + 1
        };

        let mut children: Vec<TreeEntry> = read
            .filter_map(|e| e.ok())
            .filter_map(|dirent| {
                let name = dirent.file_name().to_string_lossy().into_owned();
                let file_type = dirent.file_type().ok()?;
                let kind = if file_type.is_dir() {
                    EntryKind::Directory
                } else if file_type.is_file() {
                    EntryKind::File
                } else {
                    // Symlinks and special files are not walked
                    return None;
                };

                let rel_path = if rel_prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", rel_prefix, name)
                };

                if self.should_skip(&name, &rel_path, kind) {
                    return None;
                }

                Some(TreeEntry {
                    name,
                    path: rel_path,
                    kind,
                    depth,
                })
            })
            .collect();

        children.sort_by(|a, b| {
            let rank = |e: &TreeEntry| if e.is_dir() { 0 } else { 1 };
            rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
        });
        children
    }

    fn should_skip(&self, name: &str, rel_path: &str, kind: EntryKind) -> bool {
        if kind == EntryKind::Directory && scan::SKIP_DIRS.contains(&name) {
            return true;
        }
        if kind == EntryKind::File && rel_path == self.cache_file_name {
            return true;
        }
        self.rules.is_ignored(rel_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, "x").unwrap();
    }

    fn paths(entries: &[TreeEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_ordering_dirs_before_files() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("zz.txt"));
        touch(&tmp.path().join("aa.txt"));
        fs::create_dir(tmp.path().join("src")).unwrap();
        touch(&tmp.path().join("src/lib.rs"));

        let entries = TreeScanner::new(tmp.path()).scan().unwrap();
        assert_eq!(paths(&entries), vec!["src", "src/lib.rs", "aa.txt", "zz.txt"]);
    }

    #[test]
    fn test_depth_bound() {
        let tmp = TempDir::new().unwrap();
        let mut dir = tmp.path().to_path_buf();
        for level in 0..7 {
            dir = dir.join(format!("d{}", level));
            fs::create_dir(&dir).unwrap();
        }
        touch(&dir.join("deep.txt"));

        let entries = TreeScanner::new(tmp.path()).scan().unwrap();
        assert!(entries.iter().all(|e| e.depth <= 5));
        assert!(!entries.iter().any(|e| e.name == "deep.txt"));
    }

    #[test]
    fn test_denylist_always_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("node_modules")).unwrap();
        touch(&tmp.path().join("node_modules/x.js"));
        touch(&tmp.path().join("index.js"));

        let entries = TreeScanner::new(tmp.path()).scan().unwrap();
        assert_eq!(paths(&entries), vec!["index.js"]);
    }

    #[test]
    fn test_cache_file_excluded() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join(crate::constants::cache::CACHE_FILE_NAME));
        touch(&tmp.path().join("main.rs"));

        let entries = TreeScanner::new(tmp.path()).scan().unwrap();
        assert_eq!(paths(&entries), vec!["main.rs"]);
    }

    #[test]
    fn test_ignore_rules_applied() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".gitignore"), "*.log\n").unwrap();
        touch(&tmp.path().join("build.log"));
        touch(&tmp.path().join("main.rs"));

        let entries = TreeScanner::new(tmp.path())
            .with_ignore_file(".gitignore")
            .scan()
            .unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"main.rs"));
        assert!(names.contains(&".gitignore"));
        assert!(!names.contains(&"build.log"));
    }

    #[test]
    fn test_empty_workspace_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let entries = TreeScanner::new(tmp.path()).scan().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let result = TreeScanner::new("/definitely/not/a/real/root").scan();
        assert!(matches!(result, Err(LensError::Workspace(_))));
    }

    #[test]
    fn test_rescan_of_unchanged_tree_hashes_identically() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        touch(&tmp.path().join("src/lib.rs"));
        touch(&tmp.path().join("README.md"));

        let hash_once = || {
            let entries = TreeScanner::new(tmp.path()).scan().unwrap();
            crate::cache::AnalysisCache::hash(&crate::scanner::format_tree(&entries, "fixture"))
        };

        assert_eq!(hash_once(), hash_once());
    }

    #[test]
    fn test_progress_milestones() {
        let tmp = TempDir::new().unwrap();
        for i in 0..120 {
            touch(&tmp.path().join(format!("f{:03}.txt", i)));
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let entries = TreeScanner::new(tmp.path())
            .with_progress(Arc::new(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .scan()
            .unwrap();

        assert_eq!(entries.len(), 120);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
