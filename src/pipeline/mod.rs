//! Feature Generation Pipeline
//!
//! Turns one business request into reviewed Java source files.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Planner → Architect → for each target:
//!                          Developer → Extract → Policy chain (+ drift fix) → Reviewer
//!                              ↑                                                 │
//!                              └────────────── feedback (bounded retries) ───────┘
//! ```
//!
//! Targets run strictly in order. The method contract of every approved
//! target is fed into the developer prompt of the targets after it.

pub mod contracts;
pub mod correction;
pub mod extractor;
pub mod policy;
pub mod prompts;
pub mod retry;
pub mod transcript;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use contracts::{ContractEntry, ContractRegistry, extract_methods};
pub use correction::DriftCorrector;
pub use extractor::extract;
pub use policy::{ArtifactRole, Policy, PolicyChain, RoleClassifier, SuffixClassifier};
pub use retry::{AttemptRecord, AttemptState, RetryCause, RetryMachine, TargetOutcome};
pub use transcript::{Redactor, Session, TranscriptKind, TranscriptLogger};
pub use types::{
    ApprovedArtifact, ArchitecturePlan, DraftArtifact, FeatureRequest, Plan, ReviewStatus,
    ReviewVerdict, Stage, TargetSpec, ValidationVerdict, Violation,
};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::ai::provider::SharedProvider;
use crate::ai::timeout::{TimeoutConfig, with_timeout_or_cancel};
use crate::config::{Config, PipelineConfig};
use crate::constants::pipeline as pipeline_constants;
use crate::retrieval::{ContextRetriever, NoRetriever, Snippet};
use crate::storage::{ClassRecord, GenerationStore, MethodRecord};
use crate::types::{DraftsmithError, Result};
use prompts::{architect_prompt, planner_prompt};
use retry::{StageError, TargetContext};

// =============================================================================
// Settings
// =============================================================================

/// Which provider serves each role
#[derive(Clone)]
pub struct RoleProviders {
    pub planner: SharedProvider,
    pub architect: SharedProvider,
    pub developer: SharedProvider,
    pub reviewer: SharedProvider,
}

impl RoleProviders {
    /// One provider for all four roles
    pub fn uniform(provider: SharedProvider) -> Self {
        Self {
            planner: provider.clone(),
            architect: provider.clone(),
            developer: provider.clone(),
            reviewer: provider,
        }
    }
}

/// Resolved pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub namespace_root: String,
    pub source_prefix: String,
    pub max_attempts: u32,
    /// Empty means derive targets from the plan
    pub targets: Vec<TargetSpec>,
    pub drift_roots: Vec<String>,
    pub base_context: BTreeMap<String, String>,
    pub retrieval_k: usize,
    pub timeouts: TimeoutConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            namespace_root: pipeline.namespace_root,
            source_prefix: pipeline.source_prefix,
            max_attempts: pipeline.max_attempts,
            targets: Vec::new(),
            drift_roots: pipeline.drift_roots,
            base_context: pipeline.base_context,
            retrieval_k: pipeline.retrieval_k,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let pipeline = &config.pipeline;
        let targets = pipeline
            .targets
            .iter()
            .map(|t| TargetSpec::parse(t))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            namespace_root: pipeline.namespace_root.clone(),
            source_prefix: pipeline.source_prefix.clone(),
            max_attempts: pipeline.max_attempts,
            targets,
            drift_roots: pipeline.drift_roots.clone(),
            base_context: pipeline.base_context.clone(),
            retrieval_k: pipeline.retrieval_k,
            timeouts: TimeoutConfig::with_llm_secs(config.llm.timeout_secs),
        })
    }
}

// =============================================================================
// Output
// =============================================================================

/// Per-target attempt history
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub target: TargetSpec,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub session_id: String,
    pub plan: Plan,
    pub architecture: ArchitecturePlan,
    /// Approved artifacts in target order
    pub artifacts: Vec<ApprovedArtifact>,
    pub contracts: ContractRegistry,
    pub reports: Vec<TargetReport>,
}

impl PipelineOutput {
    /// All approved bodies, header markers kept, separated by a blank line
    pub fn combined(&self) -> String {
        self.artifacts
            .iter()
            .map(|a| a.body.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn total_attempts(&self) -> usize {
        self.reports.iter().map(|r| r.attempts.len()).sum()
    }
}

/// Where and why a run stopped
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub target: Option<TargetSpec>,
    pub error: DraftsmithError,
    /// Artifacts approved before the failure
    pub approved: Vec<ApprovedArtifact>,
}

impl PipelineFailure {
    fn at(stage: Stage, error: DraftsmithError) -> Self {
        Self {
            stage,
            target: None,
            error,
            approved: Vec::new(),
        }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} stage failed for {}: {}", self.stage, target, self.error),
            None => write!(f, "{} stage failed: {}", self.stage, self.error),
        }
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// =============================================================================
// Generation Pipeline
// =============================================================================

pub struct GenerationPipeline {
    settings: PipelineSettings,
    chain: PolicyChain,
    corrector: DriftCorrector,
    logger: TranscriptLogger,
    retriever: Arc<dyn ContextRetriever>,
    store: Option<GenerationStore>,
    cancel: CancellationToken,
}

impl GenerationPipeline {
    pub fn new(settings: PipelineSettings, logger: TranscriptLogger) -> Self {
        let chain = PolicyChain::new(settings.source_prefix.clone());
        let corrector = DriftCorrector::new(
            settings.source_prefix.clone(),
            settings.namespace_root.clone(),
            settings.drift_roots.clone(),
        );
        Self {
            settings,
            chain,
            corrector,
            logger,
            retriever: Arc::new(NoRetriever),
            store: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_chain(mut self, chain: PolicyChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ContextRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    /// Record approved artifacts and contracts after a successful run
    pub fn with_store(mut self, store: GenerationStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn session(&self) -> &Session {
        self.logger.session()
    }

    #[instrument(skip(self, request, roles), fields(feature = %request.feature_id, session = %self.logger.session().id()))]
    pub async fn run(
        &self,
        request: &FeatureRequest,
        roles: &RoleProviders,
    ) -> std::result::Result<PipelineOutput, PipelineFailure> {
        // ===== Plan =====
        self.check_cancelled(Stage::Plan)?;
        info!("Planner interpreting the request");
        let raw_plan = self
            .invoke(&roles.planner, "planner", &planner_prompt(request))
            .await
            .map_err(|e| PipelineFailure::at(Stage::Plan, e))?;
        let plan = Plan::parse(&raw_plan).map_err(|e| PipelineFailure::at(Stage::Plan, e))?;
        info!("Plan: {}", plan.feature_name);

        // ===== Architect =====
        self.check_cancelled(Stage::Architect)?;
        info!("Architect designing the solution");
        let architecture = self
            .invoke(&roles.architect, "architect", &architect_prompt(&plan))
            .await
            .map(ArchitecturePlan)
            .map_err(|e| PipelineFailure::at(Stage::Architect, e))?;

        let targets = if self.settings.targets.is_empty() {
            derive_targets(&plan, &self.settings.namespace_root)
        } else {
            let mut seen = std::collections::BTreeSet::new();
            self.settings
                .targets
                .iter()
                .filter(|t| seen.insert(*t))
                .cloned()
                .collect()
        };
        if targets.is_empty() {
            return Err(PipelineFailure::at(
                Stage::Plan,
                DraftsmithError::unparseable("planner", "plan names no artifacts to generate"),
            ));
        }
        info!(
            "Generating {} targets: {}",
            targets.len(),
            targets.iter().map(TargetSpec::local_name).collect::<Vec<_>>().join(", ")
        );

        // ===== Develop / Review =====
        let machine = RetryMachine {
            settings: &self.settings,
            chain: &self.chain,
            corrector: &self.corrector,
            logger: &self.logger,
            developer: &roles.developer,
            reviewer: &roles.reviewer,
            cancel: &self.cancel,
        };
        let mut registry = ContractRegistry::new();
        let mut artifacts: Vec<ApprovedArtifact> = Vec::with_capacity(targets.len());
        let mut reports = Vec::with_capacity(targets.len());

        for target in &targets {
            if self.cancel.is_cancelled() {
                return Err(PipelineFailure {
                    stage: Stage::Develop,
                    target: Some(target.clone()),
                    error: DraftsmithError::Cancelled,
                    approved: artifacts,
                });
            }
            info!("Generating class: {}", target);

            let snippets = self.retrieve(target, &plan).await;
            let contracts = registry.render_context();
            let ctx = TargetContext {
                target,
                plan: &plan,
                architecture: &architecture,
                contracts: &contracts,
                snippets: &snippets,
            };

            match machine.run(&ctx).await {
                Ok(outcome) => {
                    registry.register(target.clone(), outcome.artifact.contract.clone());
                    reports.push(TargetReport {
                        target: target.clone(),
                        attempts: outcome.attempts,
                    });
                    artifacts.push(outcome.artifact);
                }
                Err(StageError { stage, error, .. }) => {
                    return Err(PipelineFailure {
                        stage,
                        target: Some(target.clone()),
                        error,
                        approved: artifacts,
                    });
                }
            }
        }

        self.record(&request.feature_id, &artifacts);

        Ok(PipelineOutput {
            session_id: self.logger.session().id().to_string(),
            plan,
            architecture,
            artifacts,
            contracts: registry,
            reports,
        })
    }

    fn check_cancelled(&self, stage: Stage) -> std::result::Result<(), PipelineFailure> {
        if self.cancel.is_cancelled() {
            return Err(PipelineFailure::at(stage, DraftsmithError::Cancelled));
        }
        Ok(())
    }

    async fn invoke(&self, provider: &SharedProvider, stage: &str, prompt: &str) -> Result<String> {
        self.logger.log(stage, TranscriptKind::Input, prompt);
        let response = with_timeout_or_cancel(
            self.settings.timeouts.llm_request,
            &self.cancel,
            provider.generate(prompt),
            stage,
        )
        .await?;
        self.logger.log(stage, TranscriptKind::Output, &response.text);
        Ok(response.text)
    }

    /// Snippets for one target; failures degrade to none
    async fn retrieve(&self, target: &TargetSpec, plan: &Plan) -> Vec<Snippet> {
        if self.settings.retrieval_k == 0 {
            return Vec::new();
        }
        let query = format!(
            "{} {} {}",
            target.local_name(),
            plan.feature_name,
            plan.entities.join(" ")
        );
        let result = with_timeout_or_cancel(
            self.settings.timeouts.retrieval,
            &self.cancel,
            self.retriever.retrieve(&query, self.settings.retrieval_k),
            "retrieval",
        )
        .await;
        match result {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!("Retrieval failed for {}: {}", target, e);
                Vec::new()
            }
        }
    }

    /// Store approved artifacts; failures are logged only
    fn record(&self, feature_id: &str, artifacts: &[ApprovedArtifact]) {
        let Some(store) = &self.store else {
            return;
        };
        let result = (|| -> Result<()> {
            store.cleanup_feature(feature_id)?;
            for artifact in artifacts {
                store.insert_class(
                    feature_id,
                    &ClassRecord {
                        fqcn: artifact.target.to_string(),
                        header_path: artifact.header_path.clone(),
                        package: artifact.namespace.clone(),
                        source_code: artifact.body.clone(),
                        approved: true,
                    },
                )?;
                let methods: Vec<_> = artifact.contract.iter().map(MethodRecord::named).collect();
                store.insert_methods(feature_id, artifact.target.fqcn(), &methods)?;
            }
            Ok(())
        })();
        match result {
            Ok(()) => info!("Recorded {} artifacts for feature {}", artifacts.len(), feature_id),
            Err(e) => warn!("Failed to record artifacts for {}: {}", feature_id, e),
        }
    }
}

// =============================================================================
// Target derivation
// =============================================================================

/// Targets named by the plan: entities first, then repositories, services
/// and controllers. Each type lives in the package of the entity whose name
/// it starts with (longest match), else in the first entity's package.
pub fn derive_targets(plan: &Plan, namespace_root: &str) -> Vec<TargetSpec> {
    let entities: Vec<String> = plan.entities.iter().filter_map(|e| type_name(e)).collect();
    let fallback = entities
        .first()
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| pipeline_constants::DEFAULT_FEATURE_PACKAGE.to_string());

    let package_for = |name: &str| -> String {
        entities
            .iter()
            .filter(|e| name.starts_with(e.as_str()))
            .max_by_key(|e| e.len())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| fallback.clone())
    };

    let mut targets: Vec<TargetSpec> = Vec::new();
    let groups = [
        &plan.entities,
        &plan.repositories,
        &plan.services,
        &plan.controllers,
    ];
    for name in groups.into_iter().flatten().filter_map(|n| type_name(n)) {
        let fqcn = format!("{}.{}.{}", namespace_root, package_for(&name), name);
        match TargetSpec::parse(&fqcn) {
            Ok(target) if !targets.contains(&target) => targets.push(target),
            Ok(_) => {}
            Err(e) => warn!("Ignoring plan entry {}: {}", name, e),
        }
    }
    targets
}

/// First identifier-looking word, e.g. `"Review (entity)"` → `Review`
fn type_name(raw: &str) -> Option<String> {
    let word: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    word.chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        .then_some(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use testing::{ScriptedProvider, clean_body};
    use tempfile::TempDir;

    const ROOT: &str = "com.example.userproductapp";

    fn fqcn(name: &str) -> String {
        format!("{}.review.{}", ROOT, name)
    }

    fn plan_json() -> String {
        r#"```json
{
  "feature_name": "Product Reviews",
  "scope": ["Backend"],
  "entities": ["Review"],
  "services": ["ReviewService"],
  "controllers": ["ReviewController"],
  "repositories": ["ReviewRepository"],
  "acceptance_criteria": ["Users can post a review",],
}
```"#
            .to_string()
    }

    fn approve() -> Result<String> {
        Ok(r#"{"status": "approved", "issues": []}"#.to_string())
    }

    fn settings(targets: &[&str]) -> PipelineSettings {
        PipelineSettings {
            targets: targets.iter().map(|t| TargetSpec::parse(&fqcn(t)).unwrap()).collect(),
            ..PipelineSettings::default()
        }
    }

    const REVIEW_TARGETS: [&str; 4] = ["Review", "ReviewRepository", "ReviewService", "ReviewController"];

    #[tokio::test]
    async fn test_review_crud_end_to_end() {
        let dir = TempDir::new().unwrap();
        let logger = TranscriptLogger::new(true, dir.path(), Session::with_id("run-e2e"));

        let planner = Arc::new(ScriptedProvider::new(vec![Ok(plan_json())]));
        let architect = Arc::new(ScriptedProvider::new(vec![Ok("- review/Review.java".to_string())]));
        let developer = Arc::new(ScriptedProvider::new(vec![
            Ok(clean_body(&fqcn("Review")).replace("return items;", "// getters and setters")),
            Ok(clean_body(&fqcn("Review"))),
            Ok(clean_body(&fqcn("ReviewRepository"))),
            Ok(clean_body(&fqcn("ReviewService"))),
            Ok(clean_body(&fqcn("ReviewController"))),
        ]));
        let reviewer = Arc::new(ScriptedProvider::new(vec![approve(), approve(), approve(), approve()]));

        let roles = RoleProviders {
            planner: planner.clone(),
            architect: architect.clone(),
            developer: developer.clone(),
            reviewer: reviewer.clone(),
        };
        let pipeline = GenerationPipeline::new(settings(&REVIEW_TARGETS), logger);
        let output = pipeline
            .run(&FeatureRequest::new("Add product reviews with CRUD"), &roles)
            .await
            .unwrap();

        assert_eq!(developer.calls(), 5);
        assert_eq!(reviewer.calls(), 4);
        let attempts: Vec<_> = output.reports.iter().map(|r| r.attempts.len()).collect();
        assert_eq!(attempts, vec![2, 1, 1, 1]);

        let combined = output.combined();
        let headers: Vec<_> = combined.lines().filter(|l| l.starts_with("// FILE:")).collect();
        assert_eq!(
            headers,
            REVIEW_TARGETS
                .iter()
                .map(|t| format!("// FILE: src/main/java/com/example/userproductapp/review/{}.java", t))
                .collect::<Vec<_>>()
        );

        // Every approved target has a contract, and later prompts see earlier ones.
        assert_eq!(output.contracts.len(), 4);
        let prompts = developer.prompts();
        assert!(prompts[4].contains(&format!("{}: findAll, save", fqcn("ReviewService"))));
        assert!(!prompts[2].contains("ReviewService: findAll"));

        // Transcripts for every stage.
        let session_dir = dir.path().join("run-e2e");
        for name in [
            "planner.input.txt".to_string(),
            "architect.output.txt".to_string(),
            format!("dev:{}.code.txt", fqcn("Review")),
            format!("reviewer:{}.output.txt", fqcn("ReviewController")),
        ] {
            assert!(session_dir.join(&name).exists(), "missing {}", name);
        }
        assert_eq!(output.session_id, "run-e2e");
    }

    #[tokio::test]
    async fn test_targets_derived_from_plan() {
        let developer: Vec<_> = REVIEW_TARGETS.iter().map(|t| Ok(clean_body(&fqcn(t)))).collect();
        let roles = RoleProviders {
            planner: Arc::new(ScriptedProvider::new(vec![Ok(plan_json())])),
            architect: Arc::new(ScriptedProvider::new(vec![Ok("design".to_string())])),
            developer: Arc::new(ScriptedProvider::new(developer)),
            reviewer: Arc::new(ScriptedProvider::new((0..4).map(|_| approve()).collect())),
        };

        let pipeline = GenerationPipeline::new(PipelineSettings::default(), TranscriptLogger::disabled());
        let output = pipeline
            .run(&FeatureRequest::new("reviews"), &roles)
            .await
            .unwrap();
        let names: Vec<_> = output.artifacts.iter().map(|a| a.target.local_name()).collect();
        assert_eq!(names, REVIEW_TARGETS);
    }

    #[tokio::test]
    async fn test_repeated_target_generated_once() {
        let roles = RoleProviders {
            planner: Arc::new(ScriptedProvider::new(vec![Ok(plan_json())])),
            architect: Arc::new(ScriptedProvider::new(vec![Ok("design".to_string())])),
            developer: Arc::new(ScriptedProvider::new(vec![
                Ok(clean_body(&fqcn("Review"))),
                Ok(clean_body(&fqcn("ReviewService"))),
            ])),
            reviewer: Arc::new(ScriptedProvider::new(vec![approve(), approve()])),
        };

        let pipeline = GenerationPipeline::new(
            settings(&["Review", "ReviewService", "Review"]),
            TranscriptLogger::disabled(),
        );
        let output = pipeline
            .run(&FeatureRequest::new("reviews"), &roles)
            .await
            .unwrap();
        let names: Vec<_> = output.artifacts.iter().map(|a| a.target.local_name()).collect();
        assert_eq!(names, ["Review", "ReviewService"]);
        assert_eq!(output.combined().matches("// FILE:").count(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_plan_fails_plan_stage() {
        let roles = RoleProviders::uniform(Arc::new(ScriptedProvider::new(vec![Ok(
            "I think you should build reviews".to_string(),
        )])));
        let pipeline = GenerationPipeline::new(settings(&["Review"]), TranscriptLogger::disabled());

        let failure = pipeline.run(&FeatureRequest::new("x"), &roles).await.unwrap_err();
        assert_eq!(failure.stage, Stage::Plan);
        assert!(failure.target.is_none());
        assert!(matches!(failure.error, DraftsmithError::UnparseableOutput { .. }));
    }

    #[tokio::test]
    async fn test_exhausted_target_identified() {
        let roles = RoleProviders {
            planner: Arc::new(ScriptedProvider::new(vec![Ok(plan_json())])),
            architect: Arc::new(ScriptedProvider::new(vec![Ok("design".to_string())])),
            developer: Arc::new(ScriptedProvider::new(vec![
                Ok(clean_body(&fqcn("Review"))),
                Ok("no header".to_string()),
                Ok("still no header".to_string()),
            ])),
            reviewer: Arc::new(ScriptedProvider::new(vec![approve()])),
        };
        let mut settings = settings(&["Review", "ReviewService"]);
        settings.max_attempts = 2;
        let pipeline = GenerationPipeline::new(settings, TranscriptLogger::disabled());

        let failure = pipeline.run(&FeatureRequest::new("x"), &roles).await.unwrap_err();
        assert_eq!(failure.stage, Stage::Develop);
        assert_eq!(failure.target.as_ref().map(TargetSpec::local_name), Some("ReviewService"));
        assert!(matches!(failure.error, DraftsmithError::RetryBudgetExhausted { attempts: 2, .. }));
        assert_eq!(failure.approved.len(), 1);
        assert!(failure.to_string().contains("ReviewService"));
    }

    #[tokio::test]
    async fn test_cancelled_before_plan() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(plan_json())]));
        let pipeline = GenerationPipeline::new(settings(&["Review"]), TranscriptLogger::disabled());
        pipeline.cancellation_token().cancel();

        let failure = pipeline
            .run(&FeatureRequest::new("x"), &RoleProviders::uniform(provider.clone()))
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Plan);
        assert!(matches!(failure.error, DraftsmithError::Cancelled));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_records_contracts() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let store = GenerationStore::new(Arc::new(db));

        let roles = RoleProviders {
            planner: Arc::new(ScriptedProvider::new(vec![Ok(plan_json())])),
            architect: Arc::new(ScriptedProvider::new(vec![Ok("design".to_string())])),
            developer: Arc::new(ScriptedProvider::new(vec![Ok(clean_body(&fqcn("ReviewService")))])),
            reviewer: Arc::new(ScriptedProvider::new(vec![approve()])),
        };
        let pipeline = GenerationPipeline::new(settings(&["ReviewService"]), TranscriptLogger::disabled())
            .with_store(store.clone());
        pipeline
            .run(&FeatureRequest::new("reviews").with_feature_id("reviews"), &roles)
            .await
            .unwrap();

        let contracts = store.get_all_contracts("reviews").unwrap();
        assert_eq!(contracts[&fqcn("ReviewService")], vec!["findAll", "save"]);
        assert_eq!(store.list_classes("reviews").unwrap().len(), 1);
    }

    #[test]
    fn test_derive_targets_packages() {
        let plan = Plan {
            feature_name: "Reviews".to_string(),
            entities: vec!["Review".to_string(), "ReviewVote (entity)".to_string()],
            repositories: vec!["ReviewVoteRepository".to_string(), "ReviewRepository".to_string()],
            services: vec!["ModerationService".to_string(), "review service".to_string()],
            controllers: vec!["ReviewController".to_string()],
            ..Plan::default()
        };
        let targets: Vec<_> = derive_targets(&plan, "a.b")
            .into_iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(
            targets,
            vec![
                "a.b.review.Review",
                "a.b.reviewvote.ReviewVote",
                "a.b.reviewvote.ReviewVoteRepository",
                "a.b.review.ReviewRepository",
                "a.b.review.ModerationService",
                "a.b.review.ReviewController",
            ]
        );
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.llm.timeout_secs = 42;
        config.pipeline.targets = vec![format!("{}.review.Review", ROOT)];
        let settings = PipelineSettings::from_config(&config).unwrap();
        assert_eq!(settings.targets.len(), 1);
        assert_eq!(settings.timeouts.llm_request.as_secs(), 42);

        config.pipeline.max_attempts = 0;
        assert!(PipelineSettings::from_config(&config).is_err());

        config.pipeline.max_attempts = 3;
        config.pipeline.targets.push(format!("{}.review.Review", ROOT));
        assert!(matches!(
            PipelineSettings::from_config(&config),
            Err(DraftsmithError::Config(_))
        ));
    }
}
