//! Drift correction
//!
//! Models regularly invent their own package root or put a class in the
//! wrong directory. When the path checks fail, the header and package
//! declaration are rewritten from the target itself and known alternate
//! roots are mapped back to the canonical one; the chain then runs again.

use tracing::debug;

use super::extractor::{extract, first_header_span, first_package_span};
use super::policy::rules;
use super::types::{DraftArtifact, TargetSpec, ValidationVerdict};
use crate::constants::pipeline as pipeline_constants;

#[derive(Debug, Clone)]
pub struct DriftCorrector {
    source_prefix: String,
    namespace_root: String,
    alternate_roots: Vec<String>,
}

impl DriftCorrector {
    pub fn new(
        source_prefix: impl Into<String>,
        namespace_root: impl Into<String>,
        alternate_roots: Vec<String>,
    ) -> Self {
        Self {
            source_prefix: source_prefix.into().trim_end_matches('/').to_string(),
            namespace_root: namespace_root.into(),
            alternate_roots,
        }
    }

    /// Correction only applies to path-prefix and alignment failures
    pub fn applies_to(verdict: &ValidationVerdict) -> bool {
        verdict.failed_policy(rules::PATH_PREFIX) || verdict.failed_policy(rules::NAMESPACE_ALIGNMENT)
    }

    /// Rewritten draft; attempt and marker count carry over
    pub fn correct(&self, draft: &DraftArtifact, target: &TargetSpec) -> DraftArtifact {
        let body = self.correct_text(&draft.body, target);
        match extract(&body) {
            Some(mut corrected) => {
                corrected.attempt = draft.attempt;
                corrected.marker_count = draft.marker_count;
                corrected
            }
            None => draft.clone(),
        }
    }

    pub fn correct_text(&self, body: &str, target: &TargetSpec) -> String {
        let header = format!(
            "// FILE: {}/{}.{}",
            self.source_prefix,
            target.as_path(),
            pipeline_constants::ARTIFACT_EXTENSION
        );
        let package = format!("package {};", target.namespace());

        let mut text = match first_header_span(body) {
            Some(span) => format!("{}{}{}", &body[..span.start], header, &body[span.end..]),
            None => format!("{}\n{}", header, body),
        };

        text = match first_package_span(&text) {
            Some(span) => format!("{}{}{}", &text[..span.start], package, &text[span.end..]),
            None => {
                let end = first_header_span(&text).map(|s| s.end).unwrap_or(0);
                format!("{}\n{}\n{}", &text[..end], package, &text[end..])
            }
        };

        for alternate in &self.alternate_roots {
            if alternate.is_empty() || self.namespace_root.contains(alternate.as_str()) {
                continue;
            }
            if text.contains(alternate.as_str()) {
                debug!(from = %alternate, to = %self.namespace_root, "Remapping drifted root");
                text = text.replace(alternate.as_str(), &self.namespace_root);
            }
            let alternate_path = alternate.replace('.', "/");
            text = text.replace(&alternate_path, &self.namespace_root.replace('.', "/"));
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::policy::PolicyChain;

    const ROOT: &str = "com.example.userproductapp";

    fn corrector() -> DriftCorrector {
        DriftCorrector::new(
            "src/main/java",
            ROOT,
            vec!["com.example.productreviewsystem".to_string()],
        )
    }

    fn target() -> TargetSpec {
        TargetSpec::parse("com.example.userproductapp.review.ReviewService").unwrap()
    }

    #[test]
    fn test_corrects_drifted_root() {
        let raw = "// FILE: src/main/java/com/example/productreviewsystem/service/ReviewService.java
package com.example.productreviewsystem.service;

import com.example.productreviewsystem.repository.ReviewRepository;

public class ReviewService {
}";
        let draft = extract(raw).unwrap().with_attempt(3);
        let chain = PolicyChain::default();
        let before = chain.validate(&draft, &target(), ROOT);
        assert!(DriftCorrector::applies_to(&before));

        let corrected = corrector().correct(&draft, &target());
        assert_eq!(
            corrected.header_path,
            "src/main/java/com/example/userproductapp/review/ReviewService.java"
        );
        assert_eq!(
            corrected.namespace.as_deref(),
            Some("com.example.userproductapp.review")
        );
        assert!(corrected
            .body
            .contains("import com.example.userproductapp.repository.ReviewRepository;"));
        assert_eq!(corrected.attempt, 3);

        let after = chain.validate(&corrected, &target(), ROOT);
        assert!(after.passed(), "{:?}", after.reasons());
    }

    #[test]
    fn test_inserts_missing_package() {
        let raw = "// FILE: ReviewService.java\n\npublic class ReviewService {\n}";
        let corrected = corrector().correct(&extract(raw).unwrap(), &target());
        assert!(corrected.body.starts_with(
            "// FILE: src/main/java/com/example/userproductapp/review/ReviewService.java\npackage com.example.userproductapp.review;\n"
        ));
        assert_eq!(
            corrected.namespace.as_deref(),
            Some("com.example.userproductapp.review")
        );
    }

    #[test]
    fn test_alignment_round_trip() {
        // Whatever the model wrote, the corrected header dir and package agree.
        for (header, package) in [
            ("a/B.java", "package x.y;"),
            ("src/main/java/com/example/userproductapp/B.java", ""),
            ("src/main/java/com/example/userproductapp/review/ReviewService.java", "package wrong;"),
        ] {
            let raw = format!("// FILE: {}\n{}\nclass ReviewService {{}}", header, package);
            let corrected = corrector().correct(&extract(&raw).unwrap(), &target());
            let dir = corrected.header_path.rsplit_once('/').unwrap().0;
            let ns = corrected.namespace.unwrap();
            assert_eq!(dir, format!("src/main/java/{}", ns.replace('.', "/")));
        }
    }

    #[test]
    fn test_root_not_remapped_onto_itself() {
        let corrector = DriftCorrector::new("src/main/java", ROOT, vec!["com.example".to_string()]);
        let text = corrector.correct_text("// FILE: x\npackage y;\nclass A {}", &target());
        assert!(!text.contains("userproductapp.userproductapp"));
    }
}
