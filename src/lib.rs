//! Draftsmith - Multi-Agent Java Feature Generator
//!
//! Turns a natural-language feature request into reviewed Java source files
//! for an existing layered application, using four model roles in sequence.
//!
//! ## Core Features
//!
//! - **Role Pipeline**: planner → architect → developer → reviewer per target
//! - **Bounded Retries**: typed retry causes fed back to the developer
//! - **Policy Chain**: marker, namespace, layering and placeholder checks
//! - **Contract Propagation**: approved method sets guide later targets
//! - **Grounding**: tree-sitter snippet index of the existing codebase
//!
//! ## Quick Start
//!
//! ```ignore
//! use draftsmith::{Config, FeatureRequest, GenerationPipeline, PipelineSettings, RoleProviders};
//! use draftsmith::ai::{ProviderConfig, create_provider};
//!
//! let config = Config::default();
//! let provider = create_provider(&ProviderConfig::from(&config.llm), 2)?;
//! let pipeline = GenerationPipeline::new(
//!     PipelineSettings::from_config(&config)?,
//!     TranscriptLogger::disabled(),
//! );
//! let output = pipeline
//!     .run(&FeatureRequest::new("Add product reviews"), &RoleProviders::uniform(provider))
//!     .await?;
//! println!("{}", output.combined());
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: model providers, deadlines, structured-output recovery
//! - [`pipeline`]: controller, retry machine, policies, contracts, transcripts
//! - [`analyzer`]: Java source scanning and call graph
//! - [`retrieval`]: snippet index for prompt grounding
//! - [`persist`]: writing approved files under a project root
//! - [`storage`]: SQLite persistence with connection pooling
//! - [`config`]: layered configuration

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod persist;
pub mod pipeline;
pub mod retrieval;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{DraftsmithError, ErrorCategory, LlmError, Result, ResultExt};

pub use storage::{Database, GenerationStore, PoolConfig, SharedDatabase};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    ApprovedArtifact, FeatureRequest, GenerationPipeline, PipelineFailure, PipelineOutput,
    PipelineSettings, RetryCause, RoleProviders, Stage, TargetSpec, TranscriptLogger,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{LlmProvider, LlmResponse, SharedProvider, TimeoutConfig, create_provider};

pub use analyzer::{CallGraph, FileScanner, scan_source};
pub use persist::{ArtifactWriter, PersistReport};
pub use retrieval::{ContextRetriever, Snippet, SnippetIndex};
