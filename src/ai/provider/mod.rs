//! LLM Provider Abstraction
//!
//! The four pipeline roles (planner, architect, developer, reviewer) see the
//! model as an opaque `prompt -> text` capability. This module defines that
//! capability and the backends that implement it.
//!
//! ## Modules
//!
//! - `ollama`: local Ollama daemon over HTTP
//! - `ollama_cli`: `ollama run <model>` subprocess
//! - `openai`: OpenAI-compatible chat completions
//! - `retry`: backoff wrapper for transient transport failures

mod ollama;
mod ollama_cli;
mod openai;
mod retry;

pub use ollama::OllamaProvider;
pub use ollama_cli::OllamaCliProvider;
pub use openai::OpenAiProvider;
pub use retry::{RetryPolicy, RetryingProvider};

pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::types::{DraftsmithError, Result};

// =============================================================================
// LLM Response
// =============================================================================

/// Raw model output plus whatever usage data the backend reports
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text, unmodified
    pub text: String,
    pub usage: TokenUsage,
    /// Wall clock time of the call
    pub elapsed: Duration,
}

impl LlmResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Token usage reported by the backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Shared provider handle; one instance may serve several roles
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for a single provider instance
///
/// API keys are never serialized and are redacted in debug output. Each
/// provider converts the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "ollama", "ollama-cli", "openai"
    pub provider: String,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    4096
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for ProviderConfig {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            provider: llm.provider.clone(),
            model: Some(llm.model.clone()).filter(|m| !m.is_empty()),
            timeout_secs: llm.timeout_secs,
            temperature: llm.temperature,
            api_key: llm.api_key.clone(),
            api_base: llm.api_base.clone(),
            max_tokens: default_max_tokens(),
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// Text generation capability
///
/// Implementations perform a single call; retries belong to
/// [`RetryingProvider`] (transport) and the pipeline retry loop (content).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the backend is reachable and the model present
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration, wrapped with transport retries
pub fn create_provider(config: &ProviderConfig, max_retries: usize) -> Result<SharedProvider> {
    let inner: SharedProvider = match config.provider.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(config.clone())?),
        "ollama-cli" => Arc::new(OllamaCliProvider::new(config.clone())),
        "openai" => Arc::new(OpenAiProvider::new(config.clone())?),
        other => {
            return Err(DraftsmithError::Config(format!(
                "Unknown provider: {}. Supported: ollama, ollama-cli, openai",
                other
            )));
        }
    };

    if max_retries == 0 {
        return Ok(inner);
    }
    Ok(Arc::new(RetryingProvider::new(
        inner,
        RetryPolicy::default().with_max_retries(max_retries),
    )))
}
