//! Scan Command
//!
//! Build the method call graph of a Java source tree and print it, or store
//! it in the project database.

use std::path::PathBuf;

use crate::analyzer::{CallEdge, FileScanner, scan_files};
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::storage::CodeStore;
use crate::types::{DraftsmithError, Result};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub path: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub store: bool,
    /// text or json
    pub format: String,
}

pub fn run(options: ScanOptions) -> Result<()> {
    let root = options.path.clone().unwrap_or_else(|| PathBuf::from("."));
    let scanner = FileScanner::java_files(&root).with_exclude(&options.exclude)?;
    let graph = scan_files(scanner)?;

    if options.store {
        let ctx = CommandContext::load()?;
        let stored = CodeStore::new(&ctx.db).replace_calls(&graph.edges)?;
        Output::new().success(&format!("Stored {} call edges", stored));
        return Ok(());
    }

    match options.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&graph.edges)?),
        "text" | "" => {
            for edge in &graph.edges {
                println!("{}", render_edge(edge));
            }
            Output::new().info(&format!(
                "{} files, {} methods, {} calls ({} files skipped)",
                graph.files_scanned,
                graph.methods.len(),
                graph.edges.len(),
                graph.files_skipped
            ));
        }
        other => {
            return Err(DraftsmithError::Config(format!(
                "Unknown format '{}'. Valid values: text, json",
                other
            )));
        }
    }
    Ok(())
}

/// `UserController.list -> userService.findAll`
fn render_edge(edge: &CallEdge) -> String {
    let called = match &edge.called_qualifier {
        Some(qualifier) => format!("{}.{}", qualifier, edge.called_method),
        None => edge.called_method.clone(),
    };
    format!("{}.{} -> {}", edge.caller_class, edge.caller_method, called)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_edge() {
        let mut edge = CallEdge {
            file: "A.java".to_string(),
            caller_class: "UserController".to_string(),
            caller_method: "list".to_string(),
            called_qualifier: Some("userService".to_string()),
            called_method: "findAll".to_string(),
        };
        assert_eq!(render_edge(&edge), "UserController.list -> userService.findAll");

        edge.called_qualifier = None;
        assert_eq!(render_edge(&edge), "UserController.list -> findAll");
    }
}
