//! Retrieval of existing-codebase snippets for developer prompts.
//!
//! [`SnippetIndex`] keeps one snippet per method (`Class.method()`) and one
//! class outline per class in SQLite, and ranks them by lexical overlap with
//! the query. Retrieval is advisory: the pipeline logs failures and carries
//! on without snippets.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

use crate::analyzer::{CallGraph, scan_source};
use crate::storage::{CodeStore, SharedDatabase};
use crate::types::{DraftsmithError, Result, split_terms};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// `relative/path.java:line`
    pub location: String,
    /// Declaring class
    pub owner: String,
    /// Method name; `None` for a class outline
    pub member: Option<String>,
    pub content: String,
}

impl Snippet {
    pub fn label(&self) -> String {
        match &self.member {
            Some(member) => format!("{}.{}()", self.owner, member),
            None => self.owner.clone(),
        }
    }
}

#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Up to `k` snippets relevant to `query`, best first
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Snippet>>;
}

/// Retriever that never returns anything
pub struct NoRetriever;

#[async_trait]
impl ContextRetriever for NoRetriever {
    async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<Snippet>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub skipped_files: usize,
    pub added: usize,
    pub duplicates: usize,
}

#[derive(Clone)]
pub struct SnippetIndex {
    db: SharedDatabase,
}

impl SnippetIndex {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Scan `root` and store its classes and methods
    pub fn ingest(&self, root: &Path) -> Result<IngestReport> {
        let graph = scan_source(root)?;
        self.ingest_graph(&graph)
    }

    pub fn ingest_graph(&self, graph: &CallGraph) -> Result<IngestReport> {
        let store = CodeStore::new(&self.db);
        let mut report = IngestReport {
            files: graph.files_scanned,
            skipped_files: graph.files_skipped,
            ..IngestReport::default()
        };

        let classes = graph.classes.iter().map(|c| Snippet {
            location: format!("{}:{}", c.file, c.line),
            owner: c.class.clone(),
            member: None,
            content: c.outline.clone(),
        });
        let methods = graph.methods.iter().map(|m| Snippet {
            location: format!("{}:{}", m.file, m.line),
            owner: m.class.clone(),
            member: Some(m.method.clone()),
            content: m.source.clone(),
        });

        for snippet in classes.chain(methods) {
            if store.insert_snippet(&snippet)? {
                report.added += 1;
            } else {
                report.duplicates += 1;
            }
        }
        tracing::info!(
            "Indexed {} snippets ({} duplicates) from {} files",
            report.added,
            report.duplicates,
            report.files
        );
        Ok(report)
    }

    pub fn search(&self, query: &str, k: usize) -> Result<Vec<Snippet>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, Snippet)> = CodeStore::new(&self.db)
            .snippets()?
            .into_iter()
            .map(|s| (score(&terms, &s), s))
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            b.cmp(a)
                .then_with(|| sa.owner.cmp(&sb.owner))
                .then_with(|| sa.member.cmp(&sb.member))
        });
        Ok(scored.into_iter().take(k).map(|(_, s)| s).collect())
    }
}

#[async_trait]
impl ContextRetriever for SnippetIndex {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Snippet>> {
        // SQLite access blocks; keep it off the runtime so deadlines still fire
        let index = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || index.search(&query, k))
            .await
            .map_err(|e| DraftsmithError::Storage(format!("snippet search task failed: {}", e)))?
    }
}

fn query_terms(query: &str) -> BTreeSet<String> {
    split_terms(query)
        .into_iter()
        .filter(|t| t.len() > 1)
        .collect()
}

/// Owner matches weigh 3, member matches 2, content matches 1
fn score(terms: &BTreeSet<String>, snippet: &Snippet) -> usize {
    let owner: BTreeSet<String> = split_terms(&snippet.owner).into_iter().collect();
    let member: BTreeSet<String> = snippet
        .member
        .as_deref()
        .map(|m| split_terms(m).into_iter().collect())
        .unwrap_or_default();
    let content: BTreeSet<String> = split_terms(&snippet.content).into_iter().collect();

    terms
        .iter()
        .map(|t| {
            3 * usize::from(owner.contains(t))
                + 2 * usize::from(member.contains(t))
                + usize::from(content.contains(t))
        })
        .sum()
}
