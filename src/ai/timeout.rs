//! Capability Timeouts
//!
//! Every call to an external capability (model roles, retrieval, source
//! scan) is awaited under a caller-supplied deadline. Expiry becomes
//! [`DraftsmithError::Timeout`], which the retry loop treats as transient.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::default();
//! let text = with_timeout(config.llm_request, provider.generate(&prompt), "developer").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::constants::network as net_constants;
use crate::types::{DraftsmithError, Result};

/// Deadlines for capability calls
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// One model invocation (default: 5 minutes)
    pub llm_request: Duration,
    /// One retrieval query (default: 10 seconds)
    pub retrieval: Duration,
    /// A full source scan (default: 10 minutes)
    pub source_scan: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_request: Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS),
            retrieval: Duration::from_secs(10),
            source_scan: Duration::from_secs(600),
        }
    }
}

impl TimeoutConfig {
    /// Defaults with the model deadline taken from configuration
    pub fn with_llm_secs(secs: u64) -> Self {
        Self {
            llm_request: Duration::from_secs(secs),
            ..Self::default()
        }
    }
}

/// Execute an async operation with a timeout
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(DraftsmithError::timeout(operation_name, timeout)),
    }
}

/// [`with_timeout`] raced against a cancellation token.
///
/// Cancellation wins over an in-flight call; the call's future is dropped.
pub async fn with_timeout_or_cancel<T, F>(
    timeout: Duration,
    cancel: &CancellationToken,
    future: F,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DraftsmithError::Cancelled),
        result = with_timeout(timeout, future, operation_name) => result,
    }
}
