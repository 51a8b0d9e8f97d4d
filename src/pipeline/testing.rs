//! Scripted providers and fixture bodies shared by pipeline tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::types::TargetSpec;
use crate::ai::provider::{LlmProvider, LlmResponse};
use crate::types::{DraftsmithError, Result};

/// Replays queued responses in order and records every prompt
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    first_delay: Option<Duration>,
    delayed: AtomicBool,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
            first_delay: None,
            delayed: AtomicBool::new(false),
        }
    }

    /// Sleep before answering the first call
    pub fn with_delay_on_first(mut self, delay: Duration) -> Self {
        self.first_delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.lock().unwrap().pop_front();

        if let Some(delay) = self.first_delay
            && !self.delayed.swap(true, Ordering::SeqCst)
        {
            tokio::time::sleep(delay).await;
        }

        match next {
            Some(result) => result.map(LlmResponse::text_only),
            None => Err(DraftsmithError::unavailable("scripted", "script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "script"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// A complete, policy-clean body for `fqcn`
pub fn clean_body(fqcn: &str) -> String {
    let target = TargetSpec::parse(fqcn).unwrap();
    let name = target.local_name();
    format!(
        "// FILE: src/main/java/{path}.java
package {package};

import java.util.List;

public class {name} {{
    private final List<String> items;

    public {name}(List<String> items) {{
        this.items = items;
    }}

    public List<String> findAll() {{
        return items;
    }}

    public String save(String item) {{
        items.add(item);
        return item;
    }}
}}",
        path = target.as_path(),
        package = target.namespace(),
        name = name,
    )
}
