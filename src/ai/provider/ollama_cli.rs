//! Ollama CLI Provider
//!
//! Runs `ollama run <model>` as a subprocess with the prompt on stdin and
//! takes stdout as the response. Useful where the daemon HTTP port is not
//! exposed but the binary is on PATH.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{LlmProvider, LlmResponse, ProviderConfig, TokenUsage};
use crate::types::{DraftsmithError, ErrorCategory, ErrorClassifier, LlmError, Result};

const DEFAULT_MODEL: &str = "codellama";
const PROVIDER: &str = "ollama-cli";

/// `ollama run` subprocess provider
pub struct OllamaCliProvider {
    binary: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaCliProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            binary: "ollama".to_string(),
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Override the executable (tests, non-standard installs)
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn spawn_error(&self, e: std::io::Error) -> DraftsmithError {
        let category = if e.kind() == std::io::ErrorKind::NotFound {
            ErrorCategory::Unavailable
        } else {
            ErrorClassifier::classify(&e.to_string(), PROVIDER).category
        };
        LlmError::with_provider(
            category,
            format!("failed to spawn `{} run`: {}. Is Ollama installed?", self.binary, e),
            PROVIDER,
        )
        .into()
    }
}

#[async_trait]
impl LlmProvider for OllamaCliProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        debug!(model = %self.model, chars = prompt.len(), "ollama run");
        let start = Instant::now();

        let mut child = Command::new(&self.binary)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            DraftsmithError::timeout(
                format!("{} {}", PROVIDER, self.model),
                Duration::from_secs(self.timeout_secs),
            )
        })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                format!("process exited with non-zero status ({})", output.status)
            } else {
                format!("non-zero status ({}): {}", output.status, stderr.trim())
            };
            return Err(ErrorClassifier::classify(&detail, PROVIDER).into());
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok(LlmResponse {
            text,
            usage: TokenUsage::default(),
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
        let result = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("Ollama CLI available: {}", version.trim());
                Ok(true)
            }
            Ok(_) => {
                warn!("Ollama CLI returned an error for --version");
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama CLI not found: {}", e);
                Ok(false)
            }
        }
    }
}
