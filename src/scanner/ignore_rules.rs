//! Gitignore-Style Path Filtering
//!
//! Pure pattern evaluation against workspace-relative paths, no I/O at
//! match time. Patterns are classified lazily when matched:
//!
//! - Negation (`!pattern`): parsed but treated as never matching. This is a
//!   documented limitation, preserved deliberately; real re-include
//!   semantics are not implemented.
//! - Directory-anchored (trailing `/`)
//! - Root-anchored (leading `/`): matches the full relative path only
//! - Unanchored glob: matches any path segment or the full path
//!
//! Glob conversion: `**` crosses separators, `*` stays within one segment,
//! `?` matches one non-separator character, `.` is literal. An unparseable
//! pattern degrades to a literal match attempt; no pattern ever raises.

use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Classification of a raw gitignore line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `!pattern` - never matches (documented limitation)
    Negation,
    /// `pattern/` - intended for directories
    DirectoryAnchored,
    /// `/pattern` - matches against the full relative path only
    RootAnchored,
    /// Plain glob - matches any segment or the full path
    Unanchored,
}

/// Classify a raw pattern line. Assumes blank and comment lines were
/// already stripped.
pub fn classify(pattern: &str) -> PatternKind {
    if pattern.starts_with('!') {
        PatternKind::Negation
    } else if pattern.ends_with('/') {
        PatternKind::DirectoryAnchored
    } else if pattern.starts_with('/') {
        PatternKind::RootAnchored
    } else {
        PatternKind::Unanchored
    }
}

/// Evaluate one gitignore pattern against a relative path.
///
/// `segments` must be the `/`-split components of `path`.
pub fn pattern_matches(path: &str, segments: &[&str], pattern: &str) -> bool {
    match classify(pattern) {
        PatternKind::Negation => false,
        PatternKind::RootAnchored => {
            let body = pattern.trim_start_matches('/');
            let re = compile_glob(body);
            re.is_match(path)
        }
        PatternKind::DirectoryAnchored => {
            // Matching a file named like the directory is accepted here;
            // the scanner only feeds directory paths for these patterns
            // when it prunes subtrees.
            let body = pattern.trim_end_matches('/');
            matches_unanchored(path, segments, body)
        }
        PatternKind::Unanchored => matches_unanchored(path, segments, pattern),
    }
}

fn matches_unanchored(path: &str, segments: &[&str], pattern: &str) -> bool {
    let re = compile_glob(pattern);
    if re.is_match(path) {
        return true;
    }
    segments.iter().any(|seg| re.is_match(seg))
}

/// Convert a glob pattern to an anchored regex. Falls back to a
/// regex-escaped literal if the converted form fails to compile.
fn compile_glob(pattern: &str) -> Regex {
    let converted = glob_to_regex(pattern);
    match Regex::new(&converted) {
        Ok(re) => re,
        Err(e) => {
            debug!("Pattern '{}' did not convert cleanly ({}), matching literally", pattern, e);
            // Escaped literals always compile
            Regex::new(&format!("^{}$", regex::escape(pattern)))
                .unwrap_or_else(|_| Regex::new("$^").expect("constant regex"))
        }
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                if i + 1 < chars.len() && chars[i + 1] == '*' {
                    // `**` matches across separators
                    out.push_str(".*");
                    i += 2;
                    continue;
                }
                // `*` stays within one segment
                out.push_str("[^/]*");
            }
            '?' => out.push_str("[^/]"),
            '.' => out.push_str("\\."),
            c if "\\+()[]{}^$|".contains(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
        i += 1;
    }

    out.push('$');
    out
}

// =============================================================================
// Ignore Rule Set
// =============================================================================

/// Parsed ignore-file contents: raw patterns with comments and blank
/// lines already stripped.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<String>,
}

impl IgnoreRules {
    /// Parse newline-delimited pattern text
    pub fn parse(text: &str) -> Self {
        let patterns = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        Self { patterns }
    }

    /// Load from an ignore file under the workspace root. A missing or
    /// unreadable file yields an empty rule set, never an error.
    pub fn from_workspace(root: &Path, ignore_file: &str) -> Self {
        match std::fs::read_to_string(root.join(ignore_file)) {
            Ok(text) => Self::parse(&text),
            Err(_) => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether any pattern excludes the given relative path
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let segments: Vec<&str> = rel_path.split('/').collect();
        self.patterns
            .iter()
            .any(|p| pattern_matches(rel_path, &segments, p))
    }
}
