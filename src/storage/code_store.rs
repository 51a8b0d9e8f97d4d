//! Snippet corpus and call edges of the existing codebase.

use rusqlite::params;
use sha2::{Digest, Sha256};

use super::Database;
use crate::analyzer::CallEdge;
use crate::retrieval::Snippet;
use crate::types::{Result, log_filter_error};

pub struct CodeStore<'a> {
    db: &'a Database,
}

impl<'a> CodeStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert unless a snippet with identical content exists.
    /// Returns whether a row was added.
    pub fn insert_snippet(&self, snippet: &Snippet) -> Result<bool> {
        let added = self.db.execute(
            r#"
            INSERT INTO code_snippets (location, owner, member, content, content_hash)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(content_hash) DO NOTHING
            "#,
            &[
                &snippet.location,
                &snippet.owner,
                &snippet.member,
                &snippet.content,
                &content_hash(&snippet.content),
            ],
        )?;
        Ok(added > 0)
    }

    pub fn snippets(&self) -> Result<Vec<Snippet>> {
        let conn = self.db.connection()?;
        let mut stmt =
            conn.prepare("SELECT location, owner, member, content FROM code_snippets ORDER BY id")?;
        let snippets = stmt
            .query_map([], |row| {
                Ok(Snippet {
                    location: row.get(0)?,
                    owner: row.get(1)?,
                    member: row.get(2)?,
                    content: row.get(3)?,
                })
            })?
            .filter_map(|r| log_filter_error(r, "reading snippet"))
            .collect();
        Ok(snippets)
    }

    pub fn count_snippets(&self) -> Result<usize> {
        let conn = self.db.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM code_snippets", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn clear_snippets(&self) -> Result<()> {
        self.db.execute("DELETE FROM code_snippets", &[])?;
        Ok(())
    }

    /// Replace the stored call graph with `edges`
    pub fn replace_calls(&self, edges: &[CallEdge]) -> Result<usize> {
        self.db.transaction(|conn| {
            conn.execute("DELETE FROM method_calls", [])?;
            let mut stmt = conn.prepare(
                "INSERT INTO method_calls (file_path, caller_class, caller_method, called_qualifier, called_method)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for edge in edges {
                stmt.execute(params![
                    edge.file,
                    edge.caller_class,
                    edge.caller_method,
                    edge.called_qualifier,
                    edge.called_method
                ])?;
            }
            Ok(edges.len())
        })
    }

    pub fn calls_from(&self, caller_class: &str) -> Result<Vec<CallEdge>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT file_path, caller_class, caller_method, called_qualifier, called_method
             FROM method_calls WHERE caller_class = ?1 ORDER BY id",
        )?;
        let edges = stmt
            .query_map(params![caller_class], |row| {
                Ok(CallEdge {
                    file: row.get(0)?,
                    caller_class: row.get(1)?,
                    caller_method: row.get(2)?,
                    called_qualifier: row.get(3)?,
                    called_method: row.get(4)?,
                })
            })?
            .filter_map(|r| log_filter_error(r, "reading call edge"))
            .collect();
        Ok(edges)
    }
}

/// Hex SHA-256 of snippet content
pub fn content_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}
