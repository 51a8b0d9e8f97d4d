//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/draftsmith/) and project (.draftsmith/) level configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::constants::{network, pipeline, retry, transcript};
use crate::types::{DraftsmithError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Generation pipeline settings
    pub pipeline: PipelineConfig,

    /// Transcript logging settings
    pub trace: TraceConfig,

    /// Where approved artifacts are written
    pub persist: PersistConfig,

    /// Local database settings
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            trace: TraceConfig::default(),
            persist: PersistConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `DraftsmithError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DraftsmithError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(DraftsmithError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.max_attempts == 0 {
            return Err(DraftsmithError::Config(
                "pipeline.max_attempts must be at least 1".to_string(),
            ));
        }

        if !is_qualified_name(&self.pipeline.namespace_root) {
            return Err(DraftsmithError::Config(format!(
                "pipeline.namespace_root '{}' is not a dotted package name",
                self.pipeline.namespace_root
            )));
        }

        let root_prefix = format!("{}.", self.pipeline.namespace_root);
        let mut seen = BTreeSet::new();
        for target in &self.pipeline.targets {
            if !is_qualified_name(target) || !target.starts_with(&root_prefix) {
                return Err(DraftsmithError::Config(format!(
                    "target '{}' must be a qualified name under {}",
                    target, self.pipeline.namespace_root
                )));
            }
            if !seen.insert(target.as_str()) {
                return Err(DraftsmithError::Config(format!(
                    "target '{}' is listed more than once",
                    target
                )));
            }
        }

        Ok(())
    }
}

/// `a.b.C` style name: non-empty identifier segments joined by dots
pub(crate) fn is_qualified_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (ollama, ollama-cli, openai)
    pub provider: String,

    /// Model name
    pub model: String,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Custom endpoint
    pub api_base: Option<String>,

    /// API key (openai only; prefer OPENAI_API_KEY)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Backoff retries for transient transport failures
    pub max_retries: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "codellama".to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
            api_base: None,
            api_key: None,
            max_retries: retry::DEFAULT_MAX_RETRIES,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Package every artifact must live under
    pub namespace_root: String,

    /// Source tree prefix for header paths
    pub source_prefix: String,

    /// Attempts per target before it is abandoned
    pub max_attempts: u32,

    /// Ordered artifacts to generate; empty means derive from the plan
    pub targets: Vec<String>,

    /// Alternate roots rewritten to `namespace_root` during drift correction
    pub drift_roots: Vec<String>,

    /// Existing-codebase hints handed to the developer
    pub base_context: BTreeMap<String, String>,

    /// Retrieved snippets per developer prompt (0 disables retrieval)
    pub retrieval_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let base_context = [
            ("entities", "User, Product"),
            ("repositories", "UserRepository, ProductRepository"),
            ("services", "UserService, ProductService"),
            ("controllers", "UserController, ProductController"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            namespace_root: pipeline::DEFAULT_NAMESPACE_ROOT.to_string(),
            source_prefix: pipeline::SOURCE_PREFIX.to_string(),
            max_attempts: pipeline::DEFAULT_MAX_ATTEMPTS,
            targets: Vec::new(),
            drift_roots: pipeline::DRIFT_ROOTS.iter().map(|s| s.to_string()).collect(),
            base_context,
            retrieval_k: pipeline::DEFAULT_RETRIEVAL_K,
        }
    }
}

// =============================================================================
// Trace Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Write redacted per-stage transcripts
    pub enabled: bool,

    /// Parent directory of session directories
    pub log_dir: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: PathBuf::from(transcript::DEFAULT_LOG_DIR),
        }
    }
}

// =============================================================================
// Persist / Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Project root that generated source files are written under
    pub destination_root: PathBuf,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            destination_root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file (relative to .draftsmith/)
    pub database: PathBuf,

    /// Connection pool size
    pub pool_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("draftsmith.db"),
            pool_size: 4,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.pipeline.max_attempts, 5);
        assert_eq!(config.pipeline.namespace_root, "com.example.userproductapp");
        assert!(!config.trace.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.pipeline.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_foreign_target() {
        let mut config = Config::default();
        config.pipeline.targets = vec!["org.other.Thing".to_string()];
        assert!(config.validate().is_err());

        config.pipeline.targets = vec!["com.example.userproductapp.review.Review".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        let mut config = Config::default();
        config.pipeline.targets = vec![
            "com.example.userproductapp.review.Review".to_string(),
            "com.example.userproductapp.review.ReviewService".to_string(),
            "com.example.userproductapp.review.Review".to_string(),
        ];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DraftsmithError::Config(ref m) if m.contains("more than once")));

        config.pipeline.targets.pop();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_qualified_name() {
        assert!(is_qualified_name("com.example.app"));
        assert!(!is_qualified_name("com..app"));
        assert!(!is_qualified_name("com.1app"));
        assert!(!is_qualified_name(""));
    }

    #[test]
    fn test_llm_config_debug_redacts_key() {
        let llm = LlmConfig {
            api_key: Some("sk-secret".to_string()),
            ..LlmConfig::default()
        };
        let debug = format!("{:?}", llm);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
