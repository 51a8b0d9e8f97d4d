//! Ingest Command
//!
//! Index class outlines and method bodies of an existing codebase so
//! developer prompts can be grounded in it.

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::retrieval::SnippetIndex;
use crate::storage::CodeStore;
use crate::types::Result;

pub fn run(path: Option<PathBuf>, reset: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let root = path.unwrap_or_else(|| ctx.project_root.clone());

    if reset {
        CodeStore::new(&ctx.db).clear_snippets()?;
    }

    let report = SnippetIndex::new(ctx.db.clone()).ingest(&root)?;

    let out = Output::new();
    out.success(&format!(
        "Indexed {} snippets from {} files",
        report.added, report.files
    ));
    if report.duplicates > 0 {
        out.info(&format!("{} duplicate snippets ignored", report.duplicates));
    }
    if report.skipped_files > 0 {
        out.warning(&format!(
            "{} files could not be parsed and were skipped",
            report.skipped_files
        ));
    }
    Ok(())
}
