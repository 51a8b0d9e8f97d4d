//! Artifact role classification
//!
//! Naming heuristic only: a class is controller-like because its name ends
//! in `Controller`, not because of anything it does.

use serde::Serialize;
use std::fmt;

/// Architectural role inferred from a class name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArtifactRole {
    Controller,
    Service,
    Repository,
    Other,
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Controller => "controller",
            Self::Service => "service",
            Self::Repository => "repository",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Maps a local class name to its role
pub trait RoleClassifier: Send + Sync {
    fn classify(&self, local_name: &str) -> ArtifactRole;
}

/// Suffix-based classifier (`…Controller`, `…Service`, `…Repository`)
#[derive(Debug, Clone)]
pub struct SuffixClassifier {
    controller: Vec<String>,
    service: Vec<String>,
    repository: Vec<String>,
}

impl Default for SuffixClassifier {
    fn default() -> Self {
        Self {
            controller: vec!["Controller".to_string()],
            service: vec!["Service".to_string(), "ServiceImpl".to_string()],
            repository: vec![
                "Repository".to_string(),
                "Repo".to_string(),
                "Dao".to_string(),
            ],
        }
    }
}

impl SuffixClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffix(mut self, role: ArtifactRole, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        match role {
            ArtifactRole::Controller => self.controller.push(suffix),
            ArtifactRole::Service => self.service.push(suffix),
            ArtifactRole::Repository => self.repository.push(suffix),
            ArtifactRole::Other => {}
        }
        self
    }

    // A bare suffix (the `@Repository` annotation, say) names no collaborator.
    fn matches(name: &str, suffixes: &[String]) -> bool {
        suffixes
            .iter()
            .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix.as_str()))
    }
}

impl RoleClassifier for SuffixClassifier {
    fn classify(&self, local_name: &str) -> ArtifactRole {
        if Self::matches(local_name, &self.controller) {
            ArtifactRole::Controller
        } else if Self::matches(local_name, &self.repository) {
            ArtifactRole::Repository
        } else if Self::matches(local_name, &self.service) {
            ArtifactRole::Service
        } else {
            ArtifactRole::Other
        }
    }
}
