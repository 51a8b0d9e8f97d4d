//! Policy Validation Chain
//!
//! Ordered, non-short-circuiting checks over a [`DraftArtifact`]. Every
//! failing policy contributes one violation; a draft passes iff none fail.
//!
//! ## Default order
//!
//! 1. single-header
//! 2. no-fence
//! 3. path-prefix
//! 4. path-namespace-alignment
//! 5. no-placeholder
//! 6. no-truncation
//! 7. constructor-injection
//! 8. layering

mod classifier;
pub mod rules;

pub use classifier::{ArtifactRole, RoleClassifier, SuffixClassifier};

use std::sync::Arc;

use super::types::{DraftArtifact, TargetSpec, ValidationVerdict, Violation};
use crate::constants::pipeline as pipeline_constants;

/// Everything a policy may look at besides the draft
pub struct PolicyContext<'a> {
    pub target: &'a TargetSpec,
    pub namespace_root: &'a str,
    /// Source tree prefix, e.g. `src/main/java`
    pub source_prefix: &'a str,
    pub classifier: &'a dyn RoleClassifier,
}

impl PolicyContext<'_> {
    /// `src/main/java/com/example/app/`
    pub fn root_prefix(&self) -> String {
        format!(
            "{}/{}/",
            self.source_prefix.trim_end_matches('/'),
            self.namespace_root.replace('.', "/")
        )
    }
}

/// A single validation rule
pub trait Policy: Send + Sync {
    /// Stable identifier used in violation reports
    fn name(&self) -> &'static str;

    /// `Some(reason)` when the draft violates this policy
    fn check(&self, draft: &DraftArtifact, ctx: &PolicyContext<'_>) -> Option<String>;
}

/// Ordered list of policies sharing one role classifier
pub struct PolicyChain {
    policies: Vec<Box<dyn Policy>>,
    classifier: Arc<dyn RoleClassifier>,
    source_prefix: String,
}

impl Default for PolicyChain {
    fn default() -> Self {
        Self::new(pipeline_constants::SOURCE_PREFIX)
    }
}

impl PolicyChain {
    /// The eight built-in policies with the suffix classifier
    pub fn new(source_prefix: impl Into<String>) -> Self {
        Self {
            policies: vec![
                Box::new(rules::SingleHeader),
                Box::new(rules::NoFence),
                Box::new(rules::PathPrefix),
                Box::new(rules::NamespaceAlignment),
                Box::new(rules::NoPlaceholder),
                Box::new(rules::NoTruncation),
                Box::new(rules::ConstructorInjection),
                Box::new(rules::Layering),
            ],
            classifier: Arc::new(SuffixClassifier::default()),
            source_prefix: source_prefix.into(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn RoleClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Append a policy after the built-in ones
    pub fn with_policy(mut self, policy: Box<dyn Policy>) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn source_prefix(&self) -> &str {
        &self.source_prefix
    }

    pub fn policy_names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    /// Run every policy in order
    pub fn validate(
        &self,
        draft: &DraftArtifact,
        target: &TargetSpec,
        namespace_root: &str,
    ) -> ValidationVerdict {
        let ctx = PolicyContext {
            target,
            namespace_root,
            source_prefix: &self.source_prefix,
            classifier: self.classifier.as_ref(),
        };

        let violations = self
            .policies
            .iter()
            .filter_map(|policy| {
                policy.check(draft, &ctx).map(|message| Violation {
                    policy: policy.name(),
                    message,
                })
            })
            .collect();

        ValidationVerdict { violations }
    }
}
