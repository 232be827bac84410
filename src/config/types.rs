//! Configuration Types

use serde::{Deserialize, Serialize};

use crate::constants::network;
use crate::types::{LensError, Result};

/// Merged application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub llm: LlmConfig,
    pub scan: ScanConfig,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            scan: ScanConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.llm.timeout_secs == 0 {
            return Err(LensError::Config(
                "llm.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(LensError::Config(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.cache.file_name.trim().is_empty() || self.cache.file_name.contains('/') {
            return Err(LensError::Config(format!(
                "cache.file_name must be a bare file name, got '{}'",
                self.cache.file_name
            )));
        }
        Ok(())
    }
}

/// Remote completion service settings.
///
/// The API key is never serialized to output; the client converts it to a
/// `SecretString` internally for runtime protection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name (backend-specific); `None` uses the client default
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,
    /// API key; never serialized
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL for OpenAI-compatible endpoints
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            api_key: None,
            api_base: None,
            max_tokens: 4096,
        }
    }
}

/// Workspace scanning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Ignore-file name read from the workspace root
    pub ignore_file: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_file: ".gitignore".to_string(),
        }
    }
}

/// Analysis cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Record file name, workspace-relative
    pub file_name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file_name: crate::constants::cache::CACHE_FILE_NAME.to_string(),
        }
    }
}
