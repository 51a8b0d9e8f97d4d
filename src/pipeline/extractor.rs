//! Artifact Extractor
//!
//! Pulls exactly one file block out of free-form developer output:
//!
//! ```text
//! // FILE: src/main/java/com/example/app/review/Review.java
//! package com.example.app.review;
//! ...up to the next header marker or end of text
//! ```
//!
//! Fence markers are stripped everywhere first; surrounding prose before the
//! first marker is discarded. Extraction is pure, and re-extracting a
//! rendered draft yields the same header path and body.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use super::types::DraftArtifact;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*//[ \t]*FILE[ \t]*:[ \t]*(.+)$").unwrap());

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```\w*").unwrap());

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*package[ \t]+([A-Za-z_][\w.]*)[ \t]*;").unwrap()
});

/// Extract the first file block from raw model output.
///
/// `None` when the output has no header marker at all.
pub fn extract(raw: &str) -> Option<DraftArtifact> {
    let stripped = strip_fences(raw);
    let clean = stripped.trim_start();

    let caps = HEADER_RE.captures(clean)?;
    let first = caps.get(0)?;
    let header_path = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

    let marker_count = HEADER_RE.find_iter(clean).count();
    if marker_count > 1 {
        warn!(
            markers = marker_count,
            "Multiple file headers in output; keeping the first block"
        );
    }

    let end = HEADER_RE
        .find_at(clean, first.end())
        .map(|next| next.start())
        .unwrap_or(clean.len());
    let body = clean[first.start()..end].trim().to_string();

    Some(DraftArtifact {
        header_path: header_path.to_string(),
        namespace: package_of(&body),
        body,
        attempt: 1,
        marker_count,
    })
}

/// Remove fence markers (```` ``` ```` with an optional language tag);
/// enclosed text is untouched.
pub fn strip_fences(text: &str) -> String {
    let mut out = FENCE_RE.replace_all(text, "").into_owned();
    // Removing one fence can join backticks into another.
    while FENCE_RE.is_match(&out) {
        out = FENCE_RE.replace_all(&out, "").into_owned();
    }
    out
}

/// Number of header markers in `text`
pub fn count_markers(text: &str) -> usize {
    HEADER_RE.find_iter(text).count()
}

/// First `package a.b.c;` declaration
pub fn package_of(text: &str) -> Option<String> {
    PACKAGE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Byte range of the first header line in `text`
pub(crate) fn first_header_span(text: &str) -> Option<std::ops::Range<usize>> {
    HEADER_RE.find(text).map(|m| m.range())
}

/// Byte range of the first package declaration in `text`
pub(crate) fn first_package_span(text: &str) -> Option<std::ops::Range<usize>> {
    PACKAGE_RE.find(text).map(|m| m.range())
}

/// Split text holding several file blocks into `(header_path, block)` pairs
pub fn split_blocks(text: &str) -> Vec<(String, String)> {
    let markers: Vec<_> = HEADER_RE.captures_iter(text).collect();
    let mut blocks = Vec::with_capacity(markers.len());

    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        blocks.push((
            path.as_str().trim().to_string(),
            text[whole.start()..end].trim().to_string(),
        ));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_plain_block() {
        let raw = "// FILE: src/main/java/com/example/app/review/Review.java\npackage com.example.app.review;\n\npublic class Review {}\n";
        let draft = extract(raw).unwrap();
        assert_eq!(
            draft.header_path,
            "src/main/java/com/example/app/review/Review.java"
        );
        assert_eq!(draft.namespace.as_deref(), Some("com.example.app.review"));
        assert!(draft.body.ends_with("public class Review {}"));
        assert_eq!(draft.attempt, 1);
        assert_eq!(draft.marker_count, 1);
    }

    #[test]
    fn test_extract_tolerates_fences_and_prose() {
        let raw = "Here you go:\n```java\n  //file:   src/main/java/a/B.java  \npackage a;\nclass B {}\n```\nHope it helps.";
        let draft = extract(raw).unwrap();
        assert_eq!(draft.header_path, "src/main/java/a/B.java");
        assert!(draft.body.starts_with("//file:"));
        assert!(!draft.body.contains("```"));
        assert!(!draft.body.contains("Here you go"));
        // Trailing prose after the only marker stays in the block.
        assert!(draft.body.ends_with("Hope it helps."));
    }

    #[test]
    fn test_extract_keeps_first_of_many() {
        let raw = "// FILE: a/One.java\nclass One {}\n// FILE: a/Two.java\nclass Two {}\n";
        let draft = extract(raw).unwrap();
        assert_eq!(draft.header_path, "a/One.java");
        assert_eq!(draft.marker_count, 2);
        assert!(!draft.body.contains("Two"));
        assert_eq!(count_markers(&draft.body), 1);
    }

    #[test]
    fn test_extract_none_without_marker() {
        assert!(extract("public class Review {}").is_none());
        assert!(extract("").is_none());
        // Marker must start the line.
        assert!(extract("see // FILE: a/B.java").is_none());
    }

    #[test]
    fn test_extract_crlf() {
        let raw = "// FILE: a/B.java\r\npackage a;\r\nclass B {}\r\n";
        let draft = extract(raw).unwrap();
        assert_eq!(draft.header_path, "a/B.java");
        assert_eq!(draft.namespace.as_deref(), Some("a"));
    }

    #[test]
    fn test_missing_package() {
        let draft = extract("// FILE: a/B.java\nclass B {}").unwrap();
        assert!(draft.namespace.is_none());
    }

    #[test]
    fn test_split_blocks() {
        let text = "// FILE: a/One.java\nclass One {}\n\n// FILE: a/Two.java\nclass Two {}";
        let blocks = split_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, "a/One.java");
        assert_eq!(blocks[0].1, "// FILE: a/One.java\nclass One {}");
        assert_eq!(blocks[1].0, "a/Two.java");
    }

    proptest! {
        #[test]
        fn prop_extraction_is_idempotent(
            prefix in "[ a-zA-Z.:\n`]{0,40}",
            fence in prop::sample::select(vec!["", "```", "```java\n"]),
            path in "[a-zA-Z0-9/_.]{1,40}",
            body in "[ a-zA-Z0-9{}();.\n/`]{0,200}",
        ) {
            let raw = format!("{}\n{}// FILE: {}\n{}", prefix, fence, path, body);
            let first = extract(&raw).unwrap();
            let second = extract(first.render()).unwrap();
            prop_assert_eq!(&first.header_path, &second.header_path);
            prop_assert_eq!(&first.body, &second.body);
            prop_assert_eq!(count_markers(&second.body), 1);
        }

        #[test]
        fn prop_extract_never_panics(raw in "\\PC{0,300}") {
            let _ = extract(&raw);
        }
    }
}
