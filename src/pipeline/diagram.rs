//! Mermaid Diagram Handling
//!
//! Stage 2 output may embed a mermaid block; it is extracted for
//! validation only. When no (valid) diagram is present, a deterministic
//! local generator synthesizes one from detected features, then from
//! keyword matches against directory names, then as a two-node
//! placeholder.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::TreeEntry;

static MERMAID_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[mM]ermaid\s*\n(.*?)```").expect("constant regex")
});

/// Directory-name keywords mapped to diagram node labels
const DIRECTORY_NODES: &[(&[&str], &str)] = &[
    (&["auth", "login", "user"], "Authentication"),
    (&["api", "route"], "API"),
    (&["db", "model", "schema", "migration"], "Database"),
    (&["component", "view", "page", "ui"], "UI"),
    (&["service", "worker"], "Services"),
    (&["test", "spec"], "Tests"),
    (&["config", "settings"], "Configuration"),
];

/// Extract the first fenced mermaid block, if any
pub fn extract_mermaid(markdown: &str) -> Option<String> {
    MERMAID_BLOCK
        .captures(markdown)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Shallow syntax check: a recognized header and balanced brackets.
/// Renderability is the embedding UI's problem; this only guards against
/// obviously broken output.
pub fn is_valid_mermaid(diagram: &str) -> bool {
    let trimmed = diagram.trim();
    let Some(first_line) = trimmed.lines().next() else {
        return false;
    };

    let header = first_line.trim().to_lowercase();
    let known_header = [
        "flowchart",
        "graph",
        "sequencediagram",
        "classdiagram",
        "statediagram",
        "erdiagram",
    ]
    .iter()
    .any(|h| header.starts_with(h));
    if !known_header {
        return false;
    }

    let mut square: i64 = 0;
    let mut paren: i64 = 0;
    let mut brace: i64 = 0;
    for ch in trimmed.chars() {
        match ch {
            '[' => square += 1,
            ']' => square -= 1,
            '(' => paren += 1,
            ')' => paren -= 1,
            '{' => brace += 1,
            '}' => brace -= 1,
            _ => {}
        }
        if square < 0 || paren < 0 || brace < 0 {
            return false;
        }
    }
    square == 0 && paren == 0 && brace == 0
}

/// Deterministic local diagram synthesis
pub fn synthesize_diagram(features: &[String], entries: &[TreeEntry]) -> String {
    if !features.is_empty() {
        return diagram_from_features(features);
    }

    let nodes = nodes_from_directories(entries);
    if !nodes.is_empty() {
        return diagram_from_nodes(&nodes);
    }

    // Last resort placeholder
    "flowchart TD\n    A[Application] --> B[Modules]".to_string()
}

fn diagram_from_features(features: &[String]) -> String {
    let mut out = String::from("flowchart TD\n    APP[Application]");
    for (i, feature) in features.iter().take(8).enumerate() {
        out.push_str(&format!("\n    APP --> F{}[{}]", i, sanitize_label(feature)));
    }
    out
}

fn diagram_from_nodes(nodes: &[&str]) -> String {
    let mut out = String::from("flowchart TD\n    APP[Application]");
    for (i, node) in nodes.iter().enumerate() {
        out.push_str(&format!("\n    APP --> N{}[{}]", i, node));
    }
    out
}

/// Keyword-match directory names against the node table, preserving
/// table order for determinism
fn nodes_from_directories(entries: &[TreeEntry]) -> Vec<&'static str> {
    let dir_names: Vec<String> = entries
        .iter()
        .filter(|e| e.is_dir())
        .map(|e| e.name.to_lowercase())
        .collect();

    let mut nodes = Vec::new();
    for (keywords, label) in DIRECTORY_NODES {
        let hit = dir_names
            .iter()
            .any(|name| keywords.iter().any(|kw| name.contains(kw)));
        if hit && !nodes.contains(label) {
            nodes.push(*label);
        }
    }
    nodes
}

/// Strip characters that break mermaid node labels
fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !"[]{}()<>\"`".contains(*c))
        .collect()
}
