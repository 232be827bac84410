//! Local Fallback Heuristics
//!
//! Non-model computations used when the remote service or its output is
//! unusable: a description and feature list derived only from the tree
//! text and the dependency manifest. Keyword matching, nothing clever.

use crate::ai::resolver::detect_known_technologies;
use crate::scanner::EMPTY_WORKSPACE;
use crate::types::StructuredAnalysis;

/// Manifest dependency names mapped to feature labels
const MANIFEST_FEATURES: &[(&str, &str)] = &[
    ("react", "React"),
    ("typescript", "TypeScript"),
    ("vue", "Vue"),
    ("angular", "Angular"),
    ("svelte", "Svelte"),
    ("express", "Express"),
    ("next", "Next.js"),
    ("tokio", "Async Runtime"),
    ("serde", "Serialization"),
    ("clap", "CLI"),
    ("axum", "Web Server"),
    ("flask", "Flask"),
    ("django", "Django"),
    ("fastapi", "FastAPI"),
    ("jest", "Testing"),
    ("vitest", "Testing"),
    ("pytest", "Testing"),
    ("graphql", "GraphQL"),
    ("prisma", "Database"),
    ("sqlalchemy", "Database"),
    ("mongoose", "Database"),
    ("tailwind", "Tailwind CSS"),
];

/// Build a Stage 1 substitute from local signals only; no remote call.
pub fn fallback_analysis(tree_text: &str, manifest: Option<&str>) -> StructuredAnalysis {
    let mut features = manifest.map(features_from_manifest).unwrap_or_default();
    for tech in detect_known_technologies(tree_text) {
        if !features.contains(&tech) {
            features.push(tech);
        }
    }

    let description = if tree_text.trim() == EMPTY_WORKSPACE {
        "The workspace is empty; there is nothing to analyze yet.".to_string()
    } else {
        let file_count = tree_text
            .lines()
            .skip(1)
            .filter(|line| !line.trim_end().ends_with('/'))
            .count();
        let dir_count = tree_text
            .lines()
            .skip(1)
            .filter(|line| line.trim_end().ends_with('/'))
            .count();

        let mut text = format!(
            "This workspace contains {} files across {} directories.",
            file_count, dir_count
        );
        if !features.is_empty() {
            text.push_str(&format!(
                " Detected technologies: {}.",
                features.join(", ")
            ));
        }
        text.push_str(" (Generated locally; the remote analysis service was unavailable.)");
        text
    };

    StructuredAnalysis::new(description, features)
}

/// Scan manifest content for known dependency names
pub fn features_from_manifest(manifest: &str) -> Vec<String> {
    let lower = manifest.to_lowercase();
    let mut features = Vec::new();
    for (keyword, label) in MANIFEST_FEATURES {
        if lower.contains(keyword) && !features.contains(&label.to_string()) {
            features.push(label.to_string());
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_feature_detection() {
        let manifest = r#"{"dependencies": {"react": "^18.0.0", "typescript": "^5.0.0"}}"#;
        let features = features_from_manifest(manifest);
        assert!(features.contains(&"React".to_string()));
        assert!(features.contains(&"TypeScript".to_string()));
    }

    #[test]
    fn test_fallback_counts_tree_entries() {
        let tree = "app/\n├── src/\n│   └── main.rs\n└── Cargo.toml\n";
        let analysis = fallback_analysis(tree, None);
        assert!(analysis.description.contains("2 files"));
        assert!(analysis.description.contains("1 directories"));
    }

    #[test]
    fn test_fallback_empty_workspace() {
        let analysis = fallback_analysis(EMPTY_WORKSPACE, None);
        assert!(analysis.description.contains("empty"));
        assert!(analysis.features.is_empty());
    }

    #[test]
    fn test_fallback_merges_manifest_and_tree_features() {
        let tree = "app/\n└── docker-compose.yml\n";
        let manifest = r#"{"dependencies": {"express": "^4"}}"#;
        let analysis = fallback_analysis(tree, Some(manifest));
        assert!(analysis.features.contains(&"Express".to_string()));
        assert!(analysis.features.contains(&"Docker".to_string()));
    }
}
