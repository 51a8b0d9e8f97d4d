//! Generate Command
//!
//! Runs the feature pipeline for one request and writes the approved files.
//!
//! Ctrl-C cancels the run; artifacts approved before the interrupt are not
//! written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::ai::provider::{ProviderConfig, SharedProvider, create_provider};
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::config::Config;
use crate::persist::ArtifactWriter;
use crate::pipeline::{
    FeatureRequest, GenerationPipeline, PipelineOutput, PipelineSettings, RoleProviders, Session,
    TranscriptLogger,
};
use crate::retrieval::{ContextRetriever, NoRetriever, SnippetIndex};
use crate::storage::{CodeStore, GenerationStore};
use crate::types::{DraftsmithError, Result};

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub request: String,
    pub targets: Vec<String>,
    pub max_attempts: Option<u32>,
    pub trace: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub output: Option<PathBuf>,
    /// Run the pipeline but write nothing
    pub dry_run: bool,
    pub feature_id: Option<String>,
}

impl GenerateOptions {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if !self.targets.is_empty() {
            config.pipeline.targets = self.targets.clone();
        }
        if let Some(max_attempts) = self.max_attempts {
            config.pipeline.max_attempts = max_attempts;
        }
        if self.trace {
            config.trace.enabled = true;
        }
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(output) = &self.output {
            config.persist.destination_root = output.clone();
        }
        config.validate()
    }
}

pub fn run(options: GenerateOptions) -> Result<()> {
    if options.request.trim().is_empty() {
        return Err(DraftsmithError::Config(
            "Feature request must not be empty".to_string(),
        ));
    }

    let mut ctx = CommandContext::load()?;
    options.apply(&mut ctx.config)?;
    let config = &ctx.config;

    let settings = PipelineSettings::from_config(config)?;
    let provider = create_provider(&ProviderConfig::from(&config.llm), config.llm.max_retries)?;
    info!("Using LLM provider: {} ({})", provider.name(), provider.model());

    let session = Session::new();
    if let Some(dir) = transcript_dir(config.trace.enabled, &ctx.log_dir(), &session) {
        info!("Transcripts: {}", dir.display());
    }
    let logger = TranscriptLogger::new(config.trace.enabled, ctx.log_dir(), session);

    let retriever: Arc<dyn ContextRetriever> = if CodeStore::new(&ctx.db).count_snippets()? > 0 {
        Arc::new(SnippetIndex::new(ctx.db.clone()))
    } else {
        info!("No indexed snippets; run 'draftsmith ingest' to ground prompts in existing code");
        Arc::new(NoRetriever)
    };

    let pipeline = GenerationPipeline::new(settings, logger)
        .with_retriever(retriever)
        .with_store(GenerationStore::new(ctx.db.clone()));

    let mut request = FeatureRequest::new(options.request.clone());
    if let Some(feature_id) = &options.feature_id {
        request = request.with_feature_id(feature_id.clone());
    }

    let rt = Runtime::new()?;
    let output = rt.block_on(run_pipeline(&pipeline, &request, provider))?;

    let out = Output::new();
    out.pipeline_summary(&output);

    let writer = ArtifactWriter::new(
        config.pipeline.source_prefix.clone(),
        &config.pipeline.namespace_root,
    );
    let combined = output.combined();

    if options.dry_run {
        out.section("Dry run: nothing written");
        for (header, destination) in writer.plan(&combined) {
            match destination {
                Some(path) => println!("  {}", path.display()),
                None => out.warning(&format!("{} escapes the destination root", header)),
            }
        }
        println!("\n{}", combined);
        return Ok(());
    }

    let destination = ctx.destination_root();
    let report = writer.persist(&combined, &destination)?;
    out.persist_summary(&report);
    if report.written.is_empty() {
        out.warning("No files written");
    }
    Ok(())
}

/// Where this run's transcripts will land, before anything is written
fn transcript_dir(enabled: bool, log_dir: &Path, session: &Session) -> Option<PathBuf> {
    enabled.then(|| log_dir.join(session.id()))
}

async fn run_pipeline(
    pipeline: &GenerationPipeline,
    request: &FeatureRequest,
    provider: SharedProvider,
) -> Result<PipelineOutput> {
    match provider.health_check().await {
        Ok(true) => {}
        Ok(false) => warn!("{} reports the model is unavailable", provider.name()),
        Err(e) => warn!("Health check failed for {}: {}", provider.name(), e),
    }

    let cancel = pipeline.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling the run");
            cancel.cancel();
        }
    });

    let result = pipeline.run(request, &RoleProviders::uniform(provider)).await;
    interrupt.abort();

    result.map_err(|failure| {
        let out = Output::new();
        out.error(&failure.to_string());
        if !failure.approved.is_empty() {
            out.warning(&format!(
                "{} artifacts were approved before the failure and were not written",
                failure.approved.len()
            ));
        }
        failure.error
    })
}
