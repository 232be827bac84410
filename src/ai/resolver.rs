//! Response Resolver
//!
//! Extracts structured content from free-text model output. Remote models
//! return JSON when asked nicely, prose when they feel like it, and
//! truncated fragments under load; each consumer pattern-matches on a
//! tagged variant instead of probing fields defensively.
//!
//! Fallback chain for structured extraction:
//! 1. Fenced JSON block
//! 2. Entire text parsed as JSON
//! 3. `description:` / `features:` label lines, loosely matched
//! 4. Raw text as the description, features from a fixed keyword list
//!
//! No stage raises; each failure narrows to the next fallback.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::StructuredAnalysis;

/// Model output after classification
#[derive(Debug, Clone)]
pub enum ResolvedResponse {
    /// Parseable JSON, fenced or bare
    StructuredJson(Value),
    /// Usable prose with no recoverable JSON
    FreeText(String),
    /// Nothing usable at all
    Empty,
}

impl ResolvedResponse {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("constant regex")
});

static DESCRIPTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s#*>-]*description\s*[:\-][ \t]*(.+)$").expect("constant regex")
});

static FEATURES_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s#*>-]*features\s*[:\-][ \t]*(.*)$").expect("constant regex")
});

static BULLET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*•]\s+(.+)$").expect("constant regex"));

/// Fixed keyword list for the last-resort feature fallback.
/// Matched case-insensitively against the raw text.
const KNOWN_TECHNOLOGIES: &[(&str, &str)] = &[
    ("react", "React"),
    ("typescript", "TypeScript"),
    ("javascript", "JavaScript"),
    ("python", "Python"),
    ("rust", "Rust"),
    ("node", "Node.js"),
    ("express", "Express"),
    ("vue", "Vue"),
    ("angular", "Angular"),
    ("svelte", "Svelte"),
    ("next.js", "Next.js"),
    ("docker", "Docker"),
    ("graphql", "GraphQL"),
    ("tailwind", "Tailwind CSS"),
    ("webpack", "Webpack"),
    ("vite", "Vite"),
    ("database", "Database"),
    ("authentication", "Authentication"),
    ("api", "API"),
    ("testing", "Testing"),
];

/// Classify raw model output into a tagged variant
pub fn resolve(raw: &str) -> ResolvedResponse {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ResolvedResponse::Empty;
    }

    if let Some(value) = extract_fenced_json(trimmed) {
        return ResolvedResponse::StructuredJson(value);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed)
        && value.is_object()
    {
        return ResolvedResponse::StructuredJson(value);
    }

    ResolvedResponse::FreeText(trimmed.to_string())
}

/// Run the full fallback chain down to a usable structured analysis
pub fn extract_structured(raw: &str) -> StructuredAnalysis {
    match resolve(raw) {
        ResolvedResponse::StructuredJson(value) => analysis_from_value(&value),
        ResolvedResponse::FreeText(text) => {
            if let Some(analysis) = scan_label_lines(&text) {
                debug!("Assembled analysis from label lines");
                return analysis;
            }
            // Absolute last resort: keep the prose, mine it for keywords
            debug!("Falling back to keyword scan over raw text");
            StructuredAnalysis::new(text.clone(), detect_known_technologies(&text))
        }
        ResolvedResponse::Empty => StructuredAnalysis::default(),
    }
}

/// Build an analysis from parsed JSON, tolerating partial shapes
pub fn analysis_from_value(value: &Value) -> StructuredAnalysis {
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string());

    let features = value
        .get("features")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    StructuredAnalysis::new(description, features)
}

fn extract_fenced_json(text: &str) -> Option<Value> {
    let captures = FENCED_JSON.captures(text)?;
    serde_json::from_str(captures.get(1)?.as_str()).ok()
}

/// Loose scan for `description:` / `features:` label lines
fn scan_label_lines(text: &str) -> Option<StructuredAnalysis> {
    let description = DESCRIPTION_LABEL
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())?;

    let features = FEATURES_LABEL
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| (m.as_str().trim(), m.end()))
        .map(|(rest, label_end)| {
            if rest.is_empty() {
                // Bullet list on the following lines
                BULLET_LINE
                    .captures_iter(&text[label_end..])
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .collect()
            } else {
                rest.split(',')
                    .map(|f| f.trim().trim_matches(|c| c == '[' || c == ']' || c == '"'))
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect()
            }
        })
        .unwrap_or_default();

    Some(StructuredAnalysis::new(description, features))
}

/// Match the fixed technology keyword list against arbitrary text
pub fn detect_known_technologies(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    KNOWN_TECHNOLOGIES
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json_block() {
        let raw = "Here is the analysis:\n```json\n{\"description\": \"a CLI\", \"features\": [\"Rust\"]}\n```\nDone.";
        let analysis = extract_structured(raw);
        assert_eq!(analysis.description, "a CLI");
        assert_eq!(analysis.features, vec!["Rust"]);
    }

    #[test]
    fn test_bare_json() {
        let raw = r#"{"description": "web app", "features": ["React", "API"]}"#;
        let analysis = extract_structured(raw);
        assert_eq!(analysis.description, "web app");
        assert_eq!(analysis.features, vec!["React", "API"]);
    }

    #[test]
    fn test_label_line_fallback() {
        let raw = "Description: A small service.\nFeatures: Auth, Billing, Webhooks\n";
        let analysis = extract_structured(raw);
        assert_eq!(analysis.description, "A small service.");
        assert_eq!(analysis.features, vec!["Auth", "Billing", "Webhooks"]);
    }

    #[test]
    fn test_label_with_bullet_features() {
        let raw = "description: An API server.\nfeatures:\n- REST endpoints\n- Rate limiting\n";
        let analysis = extract_structured(raw);
        assert_eq!(analysis.description, "An API server.");
        assert_eq!(analysis.features, vec!["REST endpoints", "Rate limiting"]);
    }

    #[test]
    fn test_keyword_fallback() {
        let raw = "Some notes. No JSON here but mentions react and typescript.";
        let analysis = extract_structured(raw);
        assert_eq!(analysis.description, raw);
        assert!(analysis.features.contains(&"React".to_string()));
        assert!(analysis.features.contains(&"TypeScript".to_string()));
    }

    #[test]
    fn test_empty_input() {
        let analysis = extract_structured("   \n  ");
        assert!(analysis.is_empty());
    }

    #[test]
    fn test_resolve_variants() {
        assert!(matches!(resolve(""), ResolvedResponse::Empty));
        assert!(matches!(
            resolve("{\"a\": 1}"),
            ResolvedResponse::StructuredJson(_)
        ));
        assert!(matches!(
            resolve("just words"),
            ResolvedResponse::FreeText(_)
        ));
    }

    #[test]
    fn test_json_without_description_keeps_raw_value() {
        let raw = r#"{"summary": "something"}"#;
        let analysis = extract_structured(raw);
        assert!(analysis.description.contains("summary"));
    }
}
