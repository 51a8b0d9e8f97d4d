//! Java call graph extraction
//!
//! Every class → method → `method_invocation` in a source tree becomes a
//! [`CallEdge`]. Classes and methods are also collected as symbols so the
//! retrieval index can ingest them.

use serde::Serialize;
use std::path::Path;
use tree_sitter::{Node, Parser as TsParser, Query, QueryCursor, StreamingIterator};

use super::scanner::FileScanner;
use crate::types::{DraftsmithError, Result};

const INVOCATION_QUERY: &str = "(method_invocation) @call";

/// `caller_class.caller_method` calls `[called_qualifier.]called_method`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEdge {
    pub file: String,
    pub caller_class: String,
    pub caller_method: String,
    /// Receiver expression as written (`userService`, `this.repo`)
    pub called_qualifier: Option<String>,
    pub called_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSymbol {
    pub file: String,
    pub class: String,
    pub method: String,
    pub line: usize,
    pub source: String,
}

/// Class header plus field declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSymbol {
    pub file: String,
    pub class: String,
    pub line: usize,
    pub outline: String,
}

#[derive(Debug, Clone, Default)]
pub struct FileSymbols {
    pub classes: Vec<ClassSymbol>,
    pub methods: Vec<MethodSymbol>,
    pub edges: Vec<CallEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    pub edges: Vec<CallEdge>,
    pub classes: Vec<ClassSymbol>,
    pub methods: Vec<MethodSymbol>,
    pub files_scanned: usize,
    /// Unreadable files or files with syntax errors
    pub files_skipped: usize,
}

impl CallGraph {
    /// Edges whose caller is `class`
    pub fn calls_from<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a CallEdge> + 'a {
        self.edges.iter().filter(move |e| e.caller_class == class)
    }
}

pub struct JavaAnalyzer {
    parser: TsParser,
    invocations: Query,
}

impl JavaAnalyzer {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
        let mut parser = TsParser::new();
        parser
            .set_language(&language)
            .map_err(|e| DraftsmithError::Parse {
                message: format!("Failed to set Java language: {}", e),
                path: String::new(),
            })?;
        let invocations =
            Query::new(&language, INVOCATION_QUERY).map_err(|e| DraftsmithError::Parse {
                message: format!("Invalid invocation query: {}", e),
                path: String::new(),
            })?;
        Ok(Self {
            parser,
            invocations,
        })
    }

    /// Symbols and call edges of one file. Syntax errors are an error.
    pub fn analyze(&mut self, path: &str, content: &str) -> Result<FileSymbols> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| DraftsmithError::Parse {
                message: "Failed to parse Java file".to_string(),
                path: path.to_string(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(DraftsmithError::Parse {
                message: "syntax error".to_string(),
                path: path.to_string(),
            });
        }

        let mut symbols = FileSymbols::default();
        self.visit(root, content, path, &mut symbols);
        Ok(symbols)
    }

    fn visit(&self, node: Node<'_>, content: &str, path: &str, out: &mut FileSymbols) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "class_declaration" {
                self.visit_class(child, content, path, out);
            } else if child.kind() != "method_declaration" {
                self.visit(child, content, path, out);
            }
        }
    }

    fn visit_class(&self, class: Node<'_>, content: &str, path: &str, out: &mut FileSymbols) {
        let bytes = content.as_bytes();
        let Some(name) = class
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(bytes).ok())
        else {
            return;
        };
        let Some(body) = class.child_by_field_name("body") else {
            return;
        };

        let header = content[class.start_byte()..body.start_byte()].trim_end();
        let mut fields = Vec::new();
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "field_declaration" => {
                    if let Ok(text) = member.utf8_text(bytes) {
                        fields.push(format!("    {}", text.trim()));
                    }
                }
                "method_declaration" => self.visit_method(name, member, content, path, out),
                "class_declaration" => self.visit_class(member, content, path, out),
                _ => self.visit(member, content, path, out),
            }
        }

        let outline = if fields.is_empty() {
            format!("{} {{ }}", header)
        } else {
            format!("{} {{\n{}\n}}", header, fields.join("\n"))
        };
        out.classes.push(ClassSymbol {
            file: path.to_string(),
            class: name.to_string(),
            line: class.start_position().row + 1,
            outline,
        });
    }

    fn visit_method(&self, class: &str, method: Node<'_>, content: &str, path: &str, out: &mut FileSymbols) {
        let bytes = content.as_bytes();
        let Some(name) = method
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(bytes).ok())
        else {
            return;
        };

        out.methods.push(MethodSymbol {
            file: path.to_string(),
            class: class.to_string(),
            method: name.to_string(),
            line: method.start_position().row + 1,
            source: method.utf8_text(bytes).unwrap_or_default().to_string(),
        });

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.invocations, method, bytes);
        while let Some(m) = matches.next() {
            for cap in m.captures {
                let call = cap.node;
                let Some(called_method) = call
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(bytes).ok())
                else {
                    continue;
                };
                let called_qualifier = call
                    .child_by_field_name("object")
                    .and_then(|n| n.utf8_text(bytes).ok())
                    .map(str::to_string);
                out.edges.push(CallEdge {
                    file: path.to_string(),
                    caller_class: class.to_string(),
                    caller_method: name.to_string(),
                    called_qualifier,
                    called_method: called_method.to_string(),
                });
            }
        }
    }
}

/// Parse every Java file under `root`. Unreadable or unparseable files are
/// skipped with a warning.
pub fn scan_source(root: &Path) -> Result<CallGraph> {
    scan_files(FileScanner::java_files(root))
}

pub fn scan_files(scanner: FileScanner) -> Result<CallGraph> {
    let mut analyzer = JavaAnalyzer::new()?;
    let mut graph = CallGraph::default();

    for file in scanner.scan()? {
        let content = match std::fs::read_to_string(&file.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", file.relative, e);
                graph.files_skipped += 1;
                continue;
            }
        };
        match analyzer.analyze(&file.relative, &content) {
            Ok(symbols) => {
                graph.files_scanned += 1;
                graph.edges.extend(symbols.edges);
                graph.classes.extend(symbols.classes);
                graph.methods.extend(symbols.methods);
            }
            Err(e) => {
                tracing::warn!("Skipped file ({})", e);
                graph.files_skipped += 1;
            }
        }
    }

    tracing::info!(
        "Scanned {} Java files ({} skipped): {} methods, {} calls",
        graph.files_scanned,
        graph.files_skipped,
        graph.methods.len(),
        graph.edges.len()
    );
    Ok(graph)
}
