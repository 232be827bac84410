//! RepoLens - AI-Assisted Codebase Structure Analysis
//!
//! Scans a workspace into a deterministic directory rendering, then runs a
//! two-stage LLM pipeline over it: structured extraction (with bounded
//! tool-calling so the model can read individual files) followed by a
//! polishing pass that produces onboarding-ready markdown.
//!
//! ## Core Features
//!
//! - **Deterministic Scanning**: depth-bounded walk with gitignore-style
//!   filtering; the rendered tree doubles as the cache key
//! - **Content-Hash Cache**: repeated runs on an unchanged codebase skip
//!   the expensive extraction stage entirely
//! - **Graceful Degradation**: every remote failure lands on a local
//!   heuristic fallback; only an unreadable workspace root is fatal
//! - **Layered Response Resolution**: fenced JSON, bare JSON, label
//!   lines, then keyword mining, in that order
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use repolens::ai::OpenAiClient;
//! use repolens::config::ConfigLoader;
//! use repolens::pipeline::Analyzer;
//!
//! let config = ConfigLoader::load()?;
//! let client = Arc::new(OpenAiClient::new(config.llm.clone())?);
//! let analyzer = Analyzer::new(".", client, &config);
//! let result = analyzer.analyze().await?;
//! println!("{}", result.markdown);
//! ```
//!
//! ## Modules
//!
//! - [`scanner`]: path filtering, tree walking, deterministic rendering
//! - [`cache`]: content-hash-keyed analysis record persistence
//! - [`ai`]: completion client, response resolver, tool execution
//! - [`pipeline`]: the two-stage orchestrator and its local fallbacks
//! - [`config`]: layered configuration loading

pub mod ai;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod scanner;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, LensError, Result};

// Domain Types
pub use types::{AnalysisResult, CodebaseHash, EntryKind, StructuredAnalysis, TreeEntry};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use cache::{AnalysisCache, CacheRecord};
pub use pipeline::{Analyzer, StepEvent, StepReporter};
pub use scanner::{EMPTY_WORKSPACE, IgnoreRules, TreeScanner, format_tree};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    CompletionRequest,
    CompletionResponse,
    FileReadTool,
    LlmClient,
    OpenAiClient,
    SharedClient,
    with_timeout,
};
