//! Ollama HTTP Provider
//!
//! Talks to a locally running Ollama daemon through `/api/generate`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{LlmProvider, LlmResponse, ProviderConfig, TokenUsage};
use crate::constants::network;
use crate::types::{DraftsmithError, ErrorCategory, ErrorClassifier, LlmError, Result};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "codellama";
const PROVIDER: &str = "ollama";

/// Ollama HTTP Provider
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Self::validate_endpoint(&api_base)?;

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        // The pipeline applies its own per-call deadline; this one only
        // guards against a wedged socket.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs.saturating_add(5)))
            .build()
            .map_err(|e| DraftsmithError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model,
            temperature: config.temperature,
            client,
        })
    }

    /// Only http/https; warn when the daemon is not local.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            DraftsmithError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DraftsmithError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Prompts will leave this machine.",
                host
            );
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn transport_error(&self, e: reqwest::Error) -> DraftsmithError {
        if e.is_connect() {
            LlmError::with_provider(
                ErrorCategory::Unavailable,
                format!(
                    "cannot connect to Ollama at {}; start it with: ollama serve",
                    self.api_base
                ),
                PROVIDER,
            )
            .into()
        } else if e.is_timeout() {
            LlmError::with_provider(ErrorCategory::Network, e.to_string(), PROVIDER).into()
        } else {
            ErrorClassifier::classify(&e.to_string(), PROVIDER).into()
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        debug!(model = %self.model, chars = prompt.len(), "Ollama generate");

        let start = Instant::now();
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.api_base))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Ollama API error ({}): {}", status, body.trim()),
                PROVIDER,
            )
            .into());
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            LlmError::with_provider(
                ErrorCategory::Transient,
                format!("unreadable Ollama response: {}", e),
                PROVIDER,
            )
        })?;

        Ok(LlmResponse {
            text: body.response,
            usage: TokenUsage {
                input_tokens: body.prompt_eval_count.unwrap_or(0),
                output_tokens: body.eval_count.unwrap_or(0),
            },
            elapsed: start.elapsed(),
        })
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let Ok(tags) = resp.json::<TagsResponse>().await else {
                    info!("Ollama is available");
                    return Ok(true);
                };
                let wanted = self.model.trim_end_matches(":latest");
                if tags.models.iter().any(|m| m.name.starts_with(wanted)) {
                    info!("Ollama is available with model: {}", self.model);
                    Ok(true)
                } else {
                    warn!(
                        "Ollama is running but model '{}' is missing. Pull with: ollama pull {}",
                        self.model, self.model
                    );
                    Ok(false)
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
