//! Source Analysis
//!
//! Reads the existing Java codebase the generated feature is added to:
//! - File scanning with gitignore support
//! - tree-sitter call graph and symbol extraction

pub mod call_graph;
pub mod scanner;

pub use call_graph::{
    CallEdge, CallGraph, ClassSymbol, JavaAnalyzer, MethodSymbol, scan_files, scan_source,
};
pub use scanner::{FileScanner, ScannedFile};
