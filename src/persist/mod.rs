//! Writes approved file blocks under a project root.
//!
//! Each `// FILE:` block is written to its header path, normalized to a
//! path relative to the destination. Existing files are never overwritten.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use crate::pipeline::extractor::split_blocks;
use crate::types::Result;

/// Top-level package segments that mark a bare package path
const PACKAGE_ROOTS: &[&str] = &["com", "org", "net", "io", "dev"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArtifact {
    pub header_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// Paths relative to the destination root
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedArtifact>,
}

impl PersistReport {
    fn skip(&mut self, header_path: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Skipping {}: {}", header_path, reason);
        self.skipped.push(SkippedArtifact {
            header_path: header_path.to_string(),
            reason,
        });
    }
}

pub struct ArtifactWriter {
    source_prefix: String,
    namespace_head: String,
}

impl ArtifactWriter {
    pub fn new(source_prefix: impl Into<String>, namespace_root: &str) -> Self {
        Self {
            source_prefix: source_prefix.into().trim_matches('/').to_string(),
            namespace_head: namespace_root.split('.').next().unwrap_or_default().to_string(),
        }
    }

    /// Relative destination for a header path, or `None` if it escapes the root
    pub fn normalize(&self, header_path: &str) -> Option<PathBuf> {
        let mut path = header_path.trim().replace('\\', "/");
        let bytes = path.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            path = path[2..].to_string();
        }
        let path = path.trim_start_matches('/');

        let first = path.split('/').next().unwrap_or_default();
        let relative = if path.starts_with(&format!("{}/", self.source_prefix)) {
            PathBuf::from(path)
        } else if PACKAGE_ROOTS.contains(&first) || first == self.namespace_head {
            Path::new(&self.source_prefix).join(path)
        } else {
            PathBuf::from(path)
        };

        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        (safe && relative.file_name().is_some()).then_some(relative)
    }

    /// Destinations `persist` would write, without touching the filesystem
    pub fn plan(&self, text: &str) -> Vec<(String, Option<PathBuf>)> {
        split_blocks(text)
            .into_iter()
            .map(|(header, _)| {
                let relative = self.normalize(&header);
                (header, relative)
            })
            .collect()
    }

    pub fn persist(&self, text: &str, destination_root: &Path) -> Result<PersistReport> {
        let mut report = PersistReport::default();

        for (header, block) in split_blocks(text) {
            let Some(relative) = self.normalize(&header) else {
                report.skip(&header, "path escapes the destination root");
                continue;
            };
            let target = destination_root.join(&relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file = OpenOptions::new().write(true).create_new(true).open(&target);
            let mut file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    report.skip(&header, format!("{} already exists", relative.display()));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            file.write_all(block.as_bytes())?;
            file.write_all(b"\n")?;

            info!("Wrote {}", relative.display());
            report.written.push(relative);
        }
        Ok(report)
    }
}
