//! Per-target retry state machine
//!
//! ```text
//! Drafting → Extracting → Validating → Reviewing → Approved
//!    ↑           │             │            │
//!    └───────────┴─────────────┴────────────┘  (retry cause, next attempt)
//! ```
//!
//! Each failed attempt yields a [`RetryCause`] whose feedback goes into the
//! next developer prompt. The target is abandoned once the attempt budget
//! is spent. Non-transient capability errors and cancellation end the
//! session immediately.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::PipelineSettings;
use super::contracts::extract_methods;
use super::correction::DriftCorrector;
use super::extractor::extract;
use super::policy::PolicyChain;
use super::prompts::{DeveloperPromptInput, developer_prompt, reviewer_prompt};
use super::transcript::{TranscriptKind, TranscriptLogger};
use super::types::{
    ApprovedArtifact, ArchitecturePlan, Plan, ReviewVerdict, Stage, TargetSpec,
};
use crate::ai::provider::SharedProvider;
use crate::ai::timeout::with_timeout_or_cancel;
use crate::retrieval::Snippet;
use crate::types::{DraftsmithError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Drafting,
    Extracting,
    Validating,
    Reviewing,
    Approved,
    Abandoned,
}

/// Why an attempt did not end in approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryCause {
    /// No `// FILE:` header in developer output
    MissingArtifactMarker,
    /// Policy reasons after drift correction
    PolicyViolation(Vec<String>),
    /// Reviewer output was not a usable verdict
    UnparseableStructuredOutput(String),
    ReviewRejected(Vec<String>),
    /// Timeout or retryable transport failure
    Transient { stage: Stage, message: String },
}

impl RetryCause {
    /// Lines handed to the next developer attempt
    pub fn feedback(&self) -> Vec<String> {
        match self {
            Self::MissingArtifactMarker => vec![
                "Your answer had no // FILE: header line. Start with the header exactly as shown."
                    .to_string(),
            ],
            Self::PolicyViolation(reasons) => reasons.clone(),
            Self::ReviewRejected(issues) => issues.clone(),
            Self::UnparseableStructuredOutput(_) | Self::Transient { .. } => Vec::new(),
        }
    }

    /// Stage the cause is attributed to
    pub fn stage(&self) -> Stage {
        match self {
            Self::MissingArtifactMarker | Self::PolicyViolation(_) => Stage::Develop,
            Self::UnparseableStructuredOutput(_) | Self::ReviewRejected(_) => Stage::Review,
            Self::Transient { stage, .. } => *stage,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingArtifactMarker => "missing-artifact-marker",
            Self::PolicyViolation(_) => "policy-violation",
            Self::UnparseableStructuredOutput(_) => "unparseable-output",
            Self::ReviewRejected(_) => "review-rejected",
            Self::Transient { .. } => "transient",
        }
    }
}

/// One attempt's trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: u32,
    /// Last state reached
    pub reached: AttemptState,
    /// `None` iff approved
    pub cause: Option<RetryCause>,
}

#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub artifact: ApprovedArtifact,
    pub attempts: Vec<AttemptRecord>,
}

/// Fatal error inside the machine, with the stage it happened in
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: DraftsmithError,
    /// Attempts made before the failure
    pub attempts: Vec<AttemptRecord>,
}

/// Read-only inputs for one target
pub struct TargetContext<'a> {
    pub target: &'a TargetSpec,
    pub plan: &'a Plan,
    pub architecture: &'a ArchitecturePlan,
    pub contracts: &'a str,
    pub snippets: &'a [Snippet],
}

type AttemptResult = std::result::Result<ApprovedArtifact, (AttemptState, RetryCause)>;

pub struct RetryMachine<'a> {
    pub settings: &'a PipelineSettings,
    pub chain: &'a PolicyChain,
    pub corrector: &'a DriftCorrector,
    pub logger: &'a TranscriptLogger,
    pub developer: &'a SharedProvider,
    pub reviewer: &'a SharedProvider,
    pub cancel: &'a CancellationToken,
}

impl RetryMachine<'_> {
    /// Drive one target to approval or abandonment
    pub async fn run(&self, ctx: &TargetContext<'_>) -> std::result::Result<TargetOutcome, StageError> {
        let target = ctx.target;
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut feedback: Vec<String> = Vec::new();
        let mut last_stage = Stage::Develop;

        for attempt in 1..=self.settings.max_attempts {
            if self.cancel.is_cancelled() {
                return Err(StageError {
                    stage: last_stage,
                    error: DraftsmithError::Cancelled,
                    attempts,
                });
            }

            info!(fqcn = %target, attempt, "Developer drafting");
            let result = match self.attempt(attempt, ctx, &feedback).await {
                Ok(result) => result,
                Err((stage, error)) => {
                    return Err(StageError {
                        stage,
                        error,
                        attempts,
                    });
                }
            };

            match result {
                Ok(artifact) => {
                    info!(fqcn = %target, attempt, "Approved");
                    attempts.push(AttemptRecord {
                        attempt,
                        reached: AttemptState::Approved,
                        cause: None,
                    });
                    return Ok(TargetOutcome { artifact, attempts });
                }
                Err((reached, cause)) => {
                    warn!(
                        fqcn = %target,
                        attempt,
                        cause = cause.label(),
                        "Attempt not accepted: {}",
                        cause.feedback().join("; ")
                    );
                    last_stage = cause.stage();
                    let next_feedback = cause.feedback();
                    // Keep earlier feedback when this attempt produced none.
                    if !next_feedback.is_empty() {
                        feedback = next_feedback;
                    }
                    attempts.push(AttemptRecord {
                        attempt,
                        reached,
                        cause: Some(cause),
                    });
                }
            }
        }

        warn!(
            fqcn = %target,
            attempts = self.settings.max_attempts,
            state = ?AttemptState::Abandoned,
            "Retry budget exhausted"
        );
        Err(StageError {
            stage: last_stage,
            error: DraftsmithError::RetryBudgetExhausted {
                target: target.to_string(),
                attempts: self.settings.max_attempts,
            },
            attempts,
        })
    }

    async fn attempt(
        &self,
        attempt: u32,
        ctx: &TargetContext<'_>,
        feedback: &[String],
    ) -> std::result::Result<AttemptResult, (Stage, DraftsmithError)> {
        let target = ctx.target;
        let dev_stage = format!("dev:{}", target);
        let review_stage = format!("reviewer:{}", target);
        let root = self.settings.namespace_root.as_str();

        // Drafting
        let prompt = developer_prompt(&DeveloperPromptInput {
            plan: ctx.plan,
            architecture: ctx.architecture,
            base_context: &self.settings.base_context,
            namespace_root: root,
            source_prefix: &self.settings.source_prefix,
            target,
            contracts: ctx.contracts,
            snippets: ctx.snippets,
            feedback,
        });
        self.logger.log(&dev_stage, TranscriptKind::Input, &prompt);

        let raw = match self.invoke(self.developer, &prompt, "developer").await {
            Ok(raw) => raw,
            Err(e) if e.is_transient() => {
                return Ok(Err((
                    AttemptState::Drafting,
                    RetryCause::Transient {
                        stage: Stage::Develop,
                        message: e.to_string(),
                    },
                )));
            }
            Err(e) => return Err((Stage::Develop, e)),
        };
        self.logger.log(&dev_stage, TranscriptKind::Output, &raw);

        // Extracting
        debug!(state = ?AttemptState::Extracting, attempt);
        let Some(draft) = extract(&raw) else {
            return Ok(Err((AttemptState::Extracting, RetryCause::MissingArtifactMarker)));
        };
        let mut draft = draft.with_attempt(attempt);

        // Validating
        debug!(state = ?AttemptState::Validating, attempt);
        let mut verdict = self.chain.validate(&draft, target, root);
        if !verdict.passed() && DriftCorrector::applies_to(&verdict) {
            debug!(fqcn = %target, "Applying drift correction");
            draft = self.corrector.correct(&draft, target);
            verdict = self.chain.validate(&draft, target, root);
        }
        self.logger.log(&dev_stage, TranscriptKind::Code, &draft.body);

        if !verdict.passed() {
            return Ok(Err((
                AttemptState::Validating,
                RetryCause::PolicyViolation(verdict.reasons()),
            )));
        }

        // Reviewing
        debug!(state = ?AttemptState::Reviewing, attempt);
        let prompt = reviewer_prompt(ctx.plan, &draft.body, root);
        self.logger.log(&review_stage, TranscriptKind::Input, &prompt);

        let raw_review = match self.invoke(self.reviewer, &prompt, "reviewer").await {
            Ok(raw) => raw,
            Err(e) if e.is_transient() => {
                return Ok(Err((
                    AttemptState::Reviewing,
                    RetryCause::Transient {
                        stage: Stage::Review,
                        message: e.to_string(),
                    },
                )));
            }
            Err(e) => return Err((Stage::Review, e)),
        };
        self.logger.log(&review_stage, TranscriptKind::Output, &raw_review);

        let verdict = match ReviewVerdict::parse(&raw_review) {
            Ok(verdict) => verdict,
            Err(e) => {
                return Ok(Err((
                    AttemptState::Reviewing,
                    RetryCause::UnparseableStructuredOutput(e.to_string()),
                )));
            }
        };
        if !verdict.is_approved() {
            return Ok(Err((
                AttemptState::Reviewing,
                RetryCause::ReviewRejected(verdict.issues),
            )));
        }

        let contract = extract_methods(&draft.body, target.local_name());
        Ok(Ok(ApprovedArtifact {
            target: target.clone(),
            namespace: draft
                .namespace
                .unwrap_or_else(|| target.namespace().to_string()),
            header_path: draft.header_path,
            body: draft.body,
            attempt,
            contract,
        }))
    }

    async fn invoke(&self, provider: &SharedProvider, prompt: &str, role: &str) -> Result<String> {
        let response = with_timeout_or_cancel(
            self.settings.timeouts.llm_request,
            self.cancel,
            provider.generate(prompt),
            role,
        )
        .await?;
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{ScriptedProvider, clean_body};
    use crate::types::{ErrorCategory, LlmError};
    use std::sync::Arc;
    use std::time::Duration;

    const TARGET: &str = "com.example.userproductapp.review.ReviewService";

    struct Fixture {
        settings: PipelineSettings,
        chain: PolicyChain,
        corrector: DriftCorrector,
        logger: TranscriptLogger,
        cancel: CancellationToken,
        plan: Plan,
        architecture: ArchitecturePlan,
        target: TargetSpec,
    }

    impl Fixture {
        fn new(max_attempts: u32) -> Self {
            let settings = PipelineSettings {
                max_attempts,
                ..PipelineSettings::default()
            };
            let corrector = DriftCorrector::new(
                settings.source_prefix.clone(),
                settings.namespace_root.clone(),
                settings.drift_roots.clone(),
            );
            Self {
                chain: PolicyChain::new(settings.source_prefix.clone()),
                corrector,
                settings,
                logger: TranscriptLogger::disabled(),
                cancel: CancellationToken::new(),
                plan: Plan {
                    feature_name: "Reviews".to_string(),
                    ..Plan::default()
                },
                architecture: ArchitecturePlan("design".to_string()),
                target: TargetSpec::parse(TARGET).unwrap(),
            }
        }

        async fn run(
            &self,
            developer: &SharedProvider,
            reviewer: &SharedProvider,
        ) -> std::result::Result<TargetOutcome, StageError> {
            let machine = RetryMachine {
                settings: &self.settings,
                chain: &self.chain,
                corrector: &self.corrector,
                logger: &self.logger,
                developer,
                reviewer,
                cancel: &self.cancel,
            };
            machine
                .run(&TargetContext {
                    target: &self.target,
                    plan: &self.plan,
                    architecture: &self.architecture,
                    contracts: "",
                    snippets: &[],
                })
                .await
        }
    }

    fn approve() -> String {
        r#"{"status": "approved", "issues": []}"#.to_string()
    }

    #[tokio::test]
    async fn test_approved_first_attempt() {
        let fixture = Fixture::new(5);
        let developer: SharedProvider = Arc::new(ScriptedProvider::new(vec![Ok(clean_body(TARGET))]));
        let reviewer: SharedProvider = Arc::new(ScriptedProvider::new(vec![Ok(approve())]));

        let outcome = fixture.run(&developer, &reviewer).await.unwrap();
        assert_eq!(outcome.artifact.attempt, 1);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.artifact.contract, vec!["findAll", "save"]);
    }

    #[tokio::test]
    async fn test_every_cause_retries_with_increasing_attempts() {
        let fixture = Fixture::new(6);
        let developer = Arc::new(ScriptedProvider::new(vec![
            Ok("Sorry, here is the class without a header".to_string()),
            Ok(clean_body(TARGET).replace("return items;", "// TODO")),
            Ok(clean_body(TARGET)),
            Ok(clean_body(TARGET)),
            Err(LlmError::new(ErrorCategory::Network, "reset by peer").into()),
            Ok(clean_body(TARGET)),
        ]));
        let reviewer = Arc::new(ScriptedProvider::new(vec![
            Ok("looks fine to me".to_string()),
            Ok(r#"{"status": "rejected", "issues": ["missing @Transactional"]}"#.to_string()),
            Ok(approve()),
        ]));
        let dev: SharedProvider = developer.clone();
        let rev: SharedProvider = reviewer.clone();

        let outcome = fixture.run(&dev, &rev).await.unwrap();
        let labels: Vec<_> = outcome
            .attempts
            .iter()
            .map(|a| a.cause.as_ref().map(RetryCause::label))
            .collect();
        assert_eq!(
            labels,
            vec![
                Some("missing-artifact-marker"),
                Some("policy-violation"),
                Some("unparseable-output"),
                Some("review-rejected"),
                Some("transient"),
                None,
            ]
        );
        let numbers: Vec<_> = outcome.attempts.iter().map(|a| a.attempt).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(outcome.artifact.attempt, 6);

        // Rejection issues reach the next developer prompt.
        let prompts = developer.prompts();
        assert!(prompts[4].contains("missing @Transactional"));
        assert!(prompts[2].contains("no-placeholder"));
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let fixture = Fixture::new(2);
        let developer: SharedProvider = Arc::new(ScriptedProvider::new(vec![
            Ok(clean_body(TARGET)),
            Ok(clean_body(TARGET)),
        ]));
        let reviewer: SharedProvider = Arc::new(ScriptedProvider::new(vec![
            Ok(r#"{"status": "rejected"}"#.to_string()),
            Ok(r#"{"status": "rejected"}"#.to_string()),
        ]));

        let err = fixture.run(&developer, &reviewer).await.unwrap_err();
        assert_eq!(err.stage, Stage::Review);
        assert_eq!(err.attempts.len(), 2);
        assert!(matches!(
            err.error,
            DraftsmithError::RetryBudgetExhausted { attempts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_drift_is_corrected_before_review() {
        let fixture = Fixture::new(1);
        let drifted = clean_body(TARGET)
            .replace("com.example.userproductapp", "com.example.productreviewsystem")
            .replace("com/example/userproductapp", "com/example/productreviewsystem");
        let developer: SharedProvider = Arc::new(ScriptedProvider::new(vec![Ok(drifted)]));
        let reviewer = Arc::new(ScriptedProvider::new(vec![Ok(approve())]));
        let rev: SharedProvider = reviewer.clone();

        let outcome = fixture.run(&developer, &rev).await.unwrap();
        assert_eq!(outcome.artifact.namespace, "com.example.userproductapp.review");
        assert!(!reviewer.prompts()[0].contains("productreviewsystem"));
    }

    #[tokio::test]
    async fn test_unavailable_capability_is_fatal() {
        let fixture = Fixture::new(5);
        let developer: SharedProvider = Arc::new(ScriptedProvider::new(vec![Err(
            DraftsmithError::unavailable("ollama", "connection refused"),
        )]));
        let reviewer: SharedProvider = Arc::new(ScriptedProvider::new(vec![]));

        let err = fixture.run(&developer, &reviewer).await.unwrap_err();
        assert_eq!(err.stage, Stage::Develop);
        assert!(matches!(err.error, DraftsmithError::CapabilityUnavailable { .. }));
        assert!(err.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_consumes_attempt() {
        let mut fixture = Fixture::new(2);
        fixture.settings.timeouts.llm_request = Duration::from_millis(20);
        let developer: SharedProvider = Arc::new(
            ScriptedProvider::new(vec![Ok(clean_body(TARGET)), Ok(clean_body(TARGET))])
                .with_delay_on_first(Duration::from_secs(5)),
        );
        let reviewer: SharedProvider = Arc::new(ScriptedProvider::new(vec![Ok(approve())]));

        let outcome = fixture.run(&developer, &reviewer).await.unwrap();
        assert_eq!(outcome.artifact.attempt, 2);
        assert_eq!(
            outcome.attempts[0].cause.as_ref().map(RetryCause::stage),
            Some(Stage::Develop)
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_attempt() {
        let fixture = Fixture::new(3);
        fixture.cancel.cancel();
        let developer: SharedProvider = Arc::new(ScriptedProvider::new(vec![]));
        let reviewer: SharedProvider = Arc::new(ScriptedProvider::new(vec![]));

        let err = fixture.run(&developer, &reviewer).await.unwrap_err();
        assert!(matches!(err.error, DraftsmithError::Cancelled));
    }
}
