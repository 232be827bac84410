//! Workspace Scanning
//!
//! Path filtering, depth-bounded tree walking, and deterministic rendering.

pub mod formatter;
pub mod ignore_rules;
pub mod walker;

pub use formatter::{EMPTY_WORKSPACE, format_tree};
pub use ignore_rules::{IgnoreRules, PatternKind, classify, pattern_matches};
pub use walker::{ProgressFn, TreeScanner};
