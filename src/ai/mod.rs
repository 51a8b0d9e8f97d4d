//! Model Integration Layer
//!
//! Provider backends, prompt construction, deadlines and recovery of
//! structured output from model text.

pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use prompt::{PromptBuilder, PromptSection};
pub use provider::{
    LlmProvider, LlmResponse, OllamaCliProvider, OllamaProvider, OpenAiProvider, ProviderConfig,
    RetryPolicy, RetryingProvider, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout, with_timeout_or_cancel};
pub use validation::{JsonRepairer, parse_json_object};
