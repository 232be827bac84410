//! Tree Formatter
//!
//! Renders scanned entries into a deterministic, depth-indented text block
//! with box-drawing connectors. Pure function of the entry sequence:
//! byte-identical input yields byte-identical output, which is what the
//! cache content hash is computed over.

use crate::types::TreeEntry;

/// Rendered in place of a tree when the scan found nothing
pub const EMPTY_WORKSPACE: &str = "The workspace directory is empty.";

const MID_CHILD: &str = "├── ";
const LAST_CHILD: &str = "└── ";
const CONTINUATION: &str = "│   ";
const BLANK: &str = "    ";

/// Render entries as an indented tree rooted at `root_name`.
///
/// Last-sibling detection relies on the scanner's ordering contract:
/// pre-order, directories before files, lexicographic within kind.
pub fn format_tree(entries: &[TreeEntry], root_name: &str) -> String {
    if entries.is_empty() {
        return EMPTY_WORKSPACE.to_string();
    }

    let mut out = String::new();
    out.push_str(root_name);
    out.push('/');
    out.push('\n');

    for (i, entry) in entries.iter().enumerate() {
        for level in 0..entry.depth {
            if sibling_follows_at(entries, i, level) {
                out.push_str(CONTINUATION);
            } else {
                out.push_str(BLANK);
            }
        }

        if sibling_follows_at(entries, i, entry.depth) {
            out.push_str(MID_CHILD);
        } else {
            out.push_str(LAST_CHILD);
        }

        out.push_str(&entry.name);
        if entry.is_dir() {
            out.push('/');
        }
        out.push('\n');
    }

    out
}

/// Whether another sibling appears at `level` after position `i`, before
/// the enclosing directory at that level closes.
fn sibling_follows_at(entries: &[TreeEntry], i: usize, level: usize) -> bool {
    for next in &entries[i + 1..] {
        if next.depth < level {
            return false;
        }
        if next.depth == level {
            return true;
        }
    }
    false
}
