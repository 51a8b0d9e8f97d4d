//! Core types for the generation pipeline
//!
//! - Request types: FeatureRequest, Plan, ArchitecturePlan, TargetSpec
//! - Artifact types: DraftArtifact, ApprovedArtifact
//! - Verdict types: ValidationVerdict, ReviewVerdict

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::ai::validation::parse_json_object;
use crate::config::is_qualified_name;
use crate::constants::pipeline as pipeline_constants;
use crate::types::{DraftsmithError, Result, json_string, json_string_list, slugify};

// =============================================================================
// Request Types
// =============================================================================

/// Free-text business ask that roots a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRequest {
    pub text: String,
    /// Scopes stored contracts; derived from the text unless supplied
    pub feature_id: String,
}

impl FeatureRequest {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut feature_id = slugify(&text, pipeline_constants::FEATURE_ID_MAX_LEN);
        if feature_id.is_empty() {
            feature_id = "feature".to_string();
        }
        Self { text, feature_id }
    }

    pub fn with_feature_id(mut self, feature_id: impl Into<String>) -> Self {
        let feature_id = feature_id.into();
        if !feature_id.trim().is_empty() {
            self.feature_id = feature_id.trim().to_string();
        }
        self
    }
}

/// Planner output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub feature_name: String,
    pub scope: Vec<String>,
    pub entities: Vec<String>,
    pub services: Vec<String>,
    pub controllers: Vec<String>,
    pub repositories: Vec<String>,
    pub acceptance_criteria: Vec<String>,
}

impl Plan {
    /// Parse planner output, repairing common JSON damage.
    ///
    /// List fields accept an array or a comma-separated string.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = Value::Object(parse_json_object(raw, "planner")?);

        let feature_name = json_string(&value, "feature_name")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if feature_name.is_empty() {
            return Err(DraftsmithError::unparseable(
                "planner",
                "plan has no feature_name",
            ));
        }

        Ok(Self {
            feature_name,
            scope: json_string_list(&value, "scope"),
            entities: json_string_list(&value, "entities"),
            services: json_string_list(&value, "services"),
            controllers: json_string_list(&value, "controllers"),
            repositories: json_string_list(&value, "repositories"),
            acceptance_criteria: json_string_list(&value, "acceptance_criteria"),
        })
    }

    /// Canonical JSON rendering used inside later prompts
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.feature_name.clone())
    }
}

/// Architect output, carried verbatim into every developer prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchitecturePlan(pub String);

impl ArchitecturePlan {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fully-qualified name of one artifact to generate (`a.b.C`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetSpec {
    fqcn: String,
}

impl TargetSpec {
    pub fn parse(fqcn: &str) -> Result<Self> {
        let fqcn = fqcn.trim();
        if !fqcn.contains('.') || !is_qualified_name(fqcn) {
            return Err(DraftsmithError::Config(format!(
                "target '{}' is not a fully-qualified name (expected a.b.Name)",
                fqcn
            )));
        }
        Ok(Self {
            fqcn: fqcn.to_string(),
        })
    }

    pub fn fqcn(&self) -> &str {
        &self.fqcn
    }

    /// `a.b` for `a.b.C`
    pub fn namespace(&self) -> &str {
        self.fqcn
            .rsplit_once('.')
            .map(|(ns, _)| ns)
            .unwrap_or_default()
    }

    /// `C` for `a.b.C`
    pub fn local_name(&self) -> &str {
        self.fqcn
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(&self.fqcn)
    }

    /// `a/b/C` for `a.b.C`
    pub fn as_path(&self) -> String {
        self.fqcn.replace('.', "/")
    }

    pub fn is_under(&self, namespace_root: &str) -> bool {
        self.fqcn
            .strip_prefix(namespace_root)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqcn)
    }
}

impl TryFrom<String> for TargetSpec {
    type Error = DraftsmithError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TargetSpec> for String {
    fn from(target: TargetSpec) -> Self {
        target.fqcn
    }
}

// =============================================================================
// Artifact Types
// =============================================================================

/// One extracted file block from developer output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftArtifact {
    /// Path from the header marker, trimmed
    pub header_path: String,
    /// First `package` declaration in the block
    pub namespace: Option<String>,
    /// Whole block, header line included
    pub body: String,
    /// 1-based attempt that produced this draft
    pub attempt: u32,
    /// Header markers seen in the raw output
    pub marker_count: usize,
}

impl DraftArtifact {
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Block text as emitted; extracting it again yields the same draft
    pub fn render(&self) -> &str {
        &self.body
    }
}

/// A draft that passed every policy and was approved by the reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovedArtifact {
    pub target: TargetSpec,
    pub header_path: String,
    pub namespace: String,
    pub body: String,
    pub attempt: u32,
    /// Method names exposed to later targets
    pub contract: Vec<String>,
}

/// Pipeline stage, used to locate failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Plan,
    Architect,
    Develop,
    Review,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plan => "plan",
            Self::Architect => "architect",
            Self::Develop => "develop",
            Self::Review => "review",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Verdict Types
// =============================================================================

/// One failed policy check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub policy: &'static str,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.policy, self.message)
    }
}

/// Result of running the policy chain; passed iff no violations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationVerdict {
    pub violations: Vec<Violation>,
}

impl ValidationVerdict {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    pub fn failed_policy(&self, policy: &str) -> bool {
        self.violations.iter().any(|v| v.policy == policy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Approved,
    Rejected,
}

/// Reviewer decision; issues are non-empty iff rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewVerdict {
    pub status: ReviewStatus,
    pub issues: Vec<String>,
}

impl ReviewVerdict {
    pub const UNEXPLAINED_REJECTION: &'static str = "rejected without explanation";

    /// Parse reviewer output. Only `approved`/`rejected` statuses are
    /// accepted; anything else is unparseable rather than a rejection.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = Value::Object(parse_json_object(raw, "reviewer")?);

        let status = json_string(&value, "status")
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();

        match status.as_str() {
            "approved" => Ok(Self {
                status: ReviewStatus::Approved,
                issues: Vec::new(),
            }),
            "rejected" => {
                let mut issues = json_string_list(&value, "issues");
                if issues.is_empty() {
                    issues.push(Self::UNEXPLAINED_REJECTION.to_string());
                }
                Ok(Self {
                    status: ReviewStatus::Rejected,
                    issues,
                })
            }
            "" => Err(DraftsmithError::unparseable("reviewer", "missing status")),
            other => Err(DraftsmithError::unparseable(
                "reviewer",
                format!("unknown status '{}'", other),
            )),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_id_from_text() {
        let request = FeatureRequest::new("Add a Review entity with CRUD!");
        assert_eq!(request.feature_id, "add-a-review-entity-with-crud");

        let request = FeatureRequest::new("???");
        assert_eq!(request.feature_id, "feature");

        let request = FeatureRequest::new("x").with_feature_id("reviews");
        assert_eq!(request.feature_id, "reviews");
    }

    #[test]
    fn test_plan_parse_tolerates_string_lists() {
        let raw = r#"Sure! ```json
{"feature_name": "Product Reviews", "scope": "Backend",
 "entities": ["Review", "Product"], "services": "ReviewService, ProductService",
 "controllers": [], "repositories": ["ReviewRepository"],
 "acceptance_criteria": ["Users can post a review",]}
```"#;
        let plan = Plan::parse(raw).unwrap();
        assert_eq!(plan.feature_name, "Product Reviews");
        assert_eq!(plan.scope, vec!["Backend"]);
        assert_eq!(plan.services, vec!["ReviewService", "ProductService"]);
        assert!(plan.controllers.is_empty());
        assert_eq!(plan.acceptance_criteria.len(), 1);
    }

    #[test]
    fn test_plan_parse_failures() {
        assert!(Plan::parse("I cannot help with that").is_err());
        assert!(Plan::parse(r#"{"entities": ["Review"]}"#).is_err());
    }

    #[test]
    fn test_target_spec_parts() {
        let target = TargetSpec::parse("com.example.app.review.ReviewService").unwrap();
        assert_eq!(target.namespace(), "com.example.app.review");
        assert_eq!(target.local_name(), "ReviewService");
        assert_eq!(target.as_path(), "com/example/app/review/ReviewService");
        assert!(target.is_under("com.example.app"));
        assert!(!target.is_under("com.example.ap"));

        assert!(TargetSpec::parse("Review").is_err());
        assert!(TargetSpec::parse("a..B").is_err());
    }

    #[test]
    fn test_review_verdict_statuses() {
        let approved = ReviewVerdict::parse(r#"{"status": "APPROVED", "issues": ["ignored"]}"#).unwrap();
        assert!(approved.is_approved());
        assert!(approved.issues.is_empty());

        let rejected = ReviewVerdict::parse(r#"{"status": "rejected", "issues": ["uses field injection"]}"#).unwrap();
        assert_eq!(rejected.status, ReviewStatus::Rejected);
        assert_eq!(rejected.issues, vec!["uses field injection"]);

        let bare = ReviewVerdict::parse(r#"{"status": "rejected"}"#).unwrap();
        assert_eq!(bare.issues, vec![ReviewVerdict::UNEXPLAINED_REJECTION]);
    }

    #[test]
    fn test_review_verdict_unparseable() {
        assert!(ReviewVerdict::parse("LGTM, approved").is_err());
        assert!(ReviewVerdict::parse(r#"{"status": "maybe"}"#).is_err());
        assert!(ReviewVerdict::parse(r#"{"issues": []}"#).is_err());
    }

    #[test]
    fn test_validation_verdict() {
        let mut verdict = ValidationVerdict::default();
        assert!(verdict.passed());
        verdict.violations.push(Violation {
            policy: "no-fence",
            message: "markdown fence in body".to_string(),
        });
        assert!(!verdict.passed());
        assert!(verdict.failed_policy("no-fence"));
        assert_eq!(verdict.reasons(), vec!["[no-fence] markdown fence in body"]);
    }
}
