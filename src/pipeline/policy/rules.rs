//! Built-in policies, in the order a reviewer applies them.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::{ArtifactRole, Policy, PolicyContext};
use crate::pipeline::extractor::count_markers;
use crate::pipeline::types::DraftArtifact;

pub const SINGLE_HEADER: &str = "single-header";
pub const NO_FENCE: &str = "no-fence";
pub const PATH_PREFIX: &str = "path-prefix";
pub const NAMESPACE_ALIGNMENT: &str = "path-namespace-alignment";
pub const NO_PLACEHOLDER: &str = "no-placeholder";
pub const NO_TRUNCATION: &str = "no-truncation";
pub const CONSTRUCTOR_INJECTION: &str = "constructor-injection";
pub const LAYERING: &str = "layering";

// =============================================================================
// Structural
// =============================================================================

pub struct SingleHeader;

impl Policy for SingleHeader {
    fn name(&self) -> &'static str {
        SINGLE_HEADER
    }

    fn check(&self, draft: &DraftArtifact, _ctx: &PolicyContext<'_>) -> Option<String> {
        match count_markers(&draft.body) {
            1 => None,
            n => Some(format!("expected exactly one // FILE: header, found {}", n)),
        }
    }
}

pub struct NoFence;

impl Policy for NoFence {
    fn name(&self) -> &'static str {
        NO_FENCE
    }

    fn check(&self, draft: &DraftArtifact, _ctx: &PolicyContext<'_>) -> Option<String> {
        draft
            .body
            .contains("```")
            .then(|| "markdown code fence present in body".to_string())
    }
}

pub struct PathPrefix;

impl Policy for PathPrefix {
    fn name(&self) -> &'static str {
        PATH_PREFIX
    }

    fn check(&self, draft: &DraftArtifact, ctx: &PolicyContext<'_>) -> Option<String> {
        let expected = ctx.root_prefix();
        (!draft.header_path.starts_with(&expected)).then(|| {
            format!(
                "header path '{}' does not start with '{}'",
                draft.header_path, expected
            )
        })
    }
}

pub struct NamespaceAlignment;

impl Policy for NamespaceAlignment {
    fn name(&self) -> &'static str {
        NAMESPACE_ALIGNMENT
    }

    fn check(&self, draft: &DraftArtifact, ctx: &PolicyContext<'_>) -> Option<String> {
        let Some(namespace) = draft.namespace.as_deref() else {
            return Some("missing package declaration".to_string());
        };

        let header_dir = draft
            .header_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or_default();
        let prefix = ctx.source_prefix.trim_end_matches('/');
        let relative = header_dir
            .strip_prefix(prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(header_dir);
        let expected = namespace.replace('.', "/");

        (relative != expected).then(|| {
            format!(
                "package '{}' does not match header directory '{}'",
                namespace, header_dir
            )
        })
    }
}

// =============================================================================
// Content
// =============================================================================

static PLACEHOLDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)//\s*getters and setters",
        r"(?i)//\s*other methods?",
        r"(?i)//\s*\.\.\.",
        r"(?i)//\s*add method",
        r"(?i)//\s*your code here",
        r"(?i)//\s*todo",
        r"(?i)\bto be implemented\b",
        r"(?i)\bstub\b",
        r"\{\s*\.\.\.\s*\}",
        r"(?m)^\s*\.\.\.\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// `// implement...` is a placeholder; `// implemented` is not.
static IMPLEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)//\s*implement(\w*)").unwrap());

pub struct NoPlaceholder;

impl Policy for NoPlaceholder {
    fn name(&self) -> &'static str {
        NO_PLACEHOLDER
    }

    fn check(&self, draft: &DraftArtifact, _ctx: &PolicyContext<'_>) -> Option<String> {
        let mut found = BTreeSet::new();

        for pattern in PLACEHOLDER_PATTERNS.iter() {
            if let Some(m) = pattern.find(&draft.body) {
                found.insert(m.as_str().trim().to_string());
            }
        }
        for caps in IMPLEMENT_RE.captures_iter(&draft.body) {
            let suffix = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if !suffix.to_ascii_lowercase().starts_with("ed")
                && let Some(m) = caps.get(0)
            {
                found.insert(m.as_str().to_string());
            }
        }

        (!found.is_empty()).then(|| {
            let markers: Vec<_> = found.into_iter().map(|m| format!("'{}'", m)).collect();
            format!("placeholder markers found: {}", markers.join(", "))
        })
    }
}

static MID_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)\w\.\.\.[ \t]*$").unwrap());

pub struct NoTruncation;

impl Policy for NoTruncation {
    fn name(&self) -> &'static str {
        NO_TRUNCATION
    }

    fn check(&self, draft: &DraftArtifact, _ctx: &PolicyContext<'_>) -> Option<String> {
        let body = without_trailing_prose(&draft.body);
        let source = JavaSource::scan(&body);
        let mut problems = Vec::new();

        if let Some(open) = source.unterminated {
            problems.push(format!("unterminated {}", open));
        }
        if source.braces != 0 {
            problems.push(format!("unbalanced braces ({:+})", source.braces));
        }
        if source.parens != 0 {
            problems.push(format!("unbalanced parentheses ({:+})", source.parens));
        }
        if let Some(m) = MID_TOKEN_RE.find(&source.code) {
            problems.push(format!("line cut off mid-token near '{}'", m.as_str().trim()));
        }
        match source.code.lines().map(str::trim).rfind(|l| !l.is_empty()) {
            Some(last) if last.ends_with('}') || last.ends_with(';') => {}
            Some(last) => problems.push(format!("last line ends abruptly: '{}'", last)),
            None => problems.push("no code after the header".to_string()),
        }

        (!problems.is_empty()).then(|| format!("body looks truncated: {}", problems.join("; ")))
    }
}

/// Drop a closing explanation the model appended after the last top-level
/// `}`. Anything that still looks like code after it is kept.
fn without_trailing_prose(body: &str) -> std::borrow::Cow<'_, str> {
    let Some(end) = JavaSource::scan(body).top_level_end else {
        return body.into();
    };
    let (head, tail): (String, String) = {
        let chars: Vec<char> = body.chars().collect();
        (chars[..end].iter().collect(), chars[end..].iter().collect())
    };
    let mut lines = tail.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
    if lines.peek().is_none() {
        return body.into();
    }
    if lines.all(is_prose_line) {
        head.into()
    } else {
        body.into()
    }
}

fn is_prose_line(line: &str) -> bool {
    !line.contains(['{', '}', ';', '=', '@'])
        && !line.starts_with("//")
        && !line.starts_with("/*")
        && !MID_TOKEN_RE.is_match(line)
        && line.split_whitespace().filter(|w| w.chars().any(char::is_alphabetic)).count() >= 2
}

// =============================================================================
// Spring conventions
// =============================================================================

static INJECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(Autowired|Inject)\b").unwrap());

pub struct ConstructorInjection;

impl Policy for ConstructorInjection {
    fn name(&self) -> &'static str {
        CONSTRUCTOR_INJECTION
    }

    fn check(&self, draft: &DraftArtifact, _ctx: &PolicyContext<'_>) -> Option<String> {
        let code = JavaSource::scan(&draft.body).code;

        let fields: Vec<_> = INJECTION_RE
            .captures_iter(&code)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                is_field_annotation(&code[whole.end()..]).then(|| caps[1].to_string())
            })
            .collect();

        (!fields.is_empty()).then(|| {
            format!(
                "field injection via @{}; inject dependencies through the constructor",
                fields[0]
            )
        })
    }
}

/// Whether the declaration following an injection annotation is a field.
///
/// Skips the annotation's own arguments and any further annotations, then
/// looks at which of `;`, `=` or `(` comes first.
fn is_field_annotation(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    let mut i = skip_parens(bytes, skip_ws(bytes, 0));

    loop {
        i = skip_ws(bytes, i);
        if bytes.get(i) != Some(&b'@') {
            break;
        }
        i += 1;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'.')) {
            i += 1;
        }
        i = skip_parens(bytes, skip_ws(bytes, i));
    }

    bytes[i..]
        .iter()
        .find(|b| matches!(b, b';' | b'=' | b'(' | b'{'))
        .is_some_and(|b| matches!(b, b';' | b'='))
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn skip_parens(bytes: &[u8], i: usize) -> usize {
    if bytes.get(i) != Some(&b'(') {
        return i;
    }
    let mut depth = 0usize;
    for (offset, b) in bytes[i..].iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + offset + 1;
                }
            }
            _ => {}
        }
    }
    bytes.len()
}

static TYPE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Za-z0-9_]*\b").unwrap());

pub struct Layering;

impl Policy for Layering {
    fn name(&self) -> &'static str {
        LAYERING
    }

    fn check(&self, draft: &DraftArtifact, ctx: &PolicyContext<'_>) -> Option<String> {
        if ctx.classifier.classify(ctx.target.local_name()) != ArtifactRole::Controller {
            return None;
        }

        let code = JavaSource::scan(&draft.body).code;
        let repositories: BTreeSet<&str> = TYPE_NAME_RE
            .find_iter(&code)
            .map(|m| m.as_str())
            .filter(|name| ctx.classifier.classify(name) == ArtifactRole::Repository)
            .collect();

        (!repositories.is_empty()).then(|| {
            format!(
                "controller uses repository {} directly; route through a service",
                repositories.into_iter().collect::<Vec<_>>().join(", ")
            )
        })
    }
}

// =============================================================================
// Java lexical scan
// =============================================================================

/// Comment-free view of a Java body plus delimiter balance.
///
/// String, char and text-block contents are kept in `code` but ignored for
/// balance; comments are replaced by spaces (newlines kept).
struct JavaSource {
    code: String,
    braces: i64,
    parens: i64,
    unterminated: Option<&'static str>,
    /// Char index just past the last `}` that brought brace depth back to 0.
    top_level_end: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LexState {
    Code,
    LineComment,
    BlockComment,
    Str,
    Char,
    TextBlock,
}

impl JavaSource {
    fn scan(body: &str) -> Self {
        let chars: Vec<char> = body.chars().collect();
        let mut code = String::with_capacity(body.len());
        let mut braces = 0i64;
        let mut parens = 0i64;
        let mut top_level_end = None;
        let mut state = LexState::Code;
        let mut i = 0;

        let at = |i: usize, s: &str| s.chars().enumerate().all(|(k, c)| chars.get(i + k) == Some(&c));

        while i < chars.len() {
            let c = chars[i];
            match state {
                LexState::Code => {
                    if at(i, "//") {
                        state = LexState::LineComment;
                        code.push_str("  ");
                        i += 2;
                        continue;
                    }
                    if at(i, "/*") {
                        state = LexState::BlockComment;
                        code.push_str("  ");
                        i += 2;
                        continue;
                    }
                    if at(i, "\"\"\"") {
                        state = LexState::TextBlock;
                        code.push_str("\"\"\"");
                        i += 3;
                        continue;
                    }
                    match c {
                        '"' => state = LexState::Str,
                        '\'' => state = LexState::Char,
                        '{' => braces += 1,
                        '}' => {
                            braces -= 1;
                            if braces == 0 {
                                top_level_end = Some(i + 1);
                            }
                        }
                        '(' => parens += 1,
                        ')' => parens -= 1,
                        _ => {}
                    }
                    code.push(c);
                }
                LexState::LineComment => {
                    if c == '\n' {
                        state = LexState::Code;
                        code.push('\n');
                    } else {
                        code.push(' ');
                    }
                }
                LexState::BlockComment => {
                    if at(i, "*/") {
                        state = LexState::Code;
                        code.push_str("  ");
                        i += 2;
                        continue;
                    }
                    code.push(if c == '\n' { '\n' } else { ' ' });
                }
                LexState::Str | LexState::Char => {
                    let close = if state == LexState::Str { '"' } else { '\'' };
                    if c == '\\' {
                        code.push(c);
                        if let Some(&next) = chars.get(i + 1) {
                            code.push(next);
                        }
                        i += 2;
                        continue;
                    }
                    // Literals cannot span lines; recover at the newline.
                    if c == close || c == '\n' {
                        state = LexState::Code;
                    }
                    code.push(c);
                }
                LexState::TextBlock => {
                    if c == '\\' {
                        code.push(c);
                        if let Some(&next) = chars.get(i + 1) {
                            code.push(next);
                        }
                        i += 2;
                        continue;
                    }
                    if at(i, "\"\"\"") {
                        state = LexState::Code;
                        code.push_str("\"\"\"");
                        i += 3;
                        continue;
                    }
                    code.push(c);
                }
            }
            i += 1;
        }

        let unterminated = match state {
            LexState::BlockComment => Some("block comment"),
            LexState::Str => Some("string literal"),
            LexState::Char => Some("char literal"),
            LexState::TextBlock => Some("text block"),
            LexState::Code | LexState::LineComment => None,
        };

        Self {
            code,
            braces,
            parens,
            unterminated,
            top_level_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::policy::SuffixClassifier;
    use crate::pipeline::types::TargetSpec;

    const ROOT: &str = "com.example.app";

    fn draft(body: &str) -> DraftArtifact {
        crate::pipeline::extractor::extract(body).unwrap()
    }

    fn run(policy: &dyn Policy, body: &str, target: &str) -> Option<String> {
        let target = TargetSpec::parse(target).unwrap();
        let classifier = SuffixClassifier::default();
        let ctx = PolicyContext {
            target: &target,
            namespace_root: ROOT,
            source_prefix: "src/main/java",
            classifier: &classifier,
        };
        policy.check(&draft(body), &ctx)
    }

    const CLEAN: &str = "// FILE: src/main/java/com/example/app/review/ReviewService.java
package com.example.app.review;

import org.springframework.stereotype.Service;

@Service
public class ReviewService {
    private final ReviewRepository repository;

    public ReviewService(ReviewRepository repository) {
        this.repository = repository;
    }

    public Review save(Review review) {
        return repository.save(review);
    }
}";

    const SERVICE: &str = "com.example.app.review.ReviewService";

    #[test]
    fn test_clean_body_passes_every_policy() {
        let policies: Vec<Box<dyn Policy>> = vec![
            Box::new(SingleHeader),
            Box::new(NoFence),
            Box::new(PathPrefix),
            Box::new(NamespaceAlignment),
            Box::new(NoPlaceholder),
            Box::new(NoTruncation),
            Box::new(ConstructorInjection),
            Box::new(Layering),
        ];
        for policy in &policies {
            assert_eq!(run(policy.as_ref(), CLEAN, SERVICE), None, "{}", policy.name());
        }
    }

    #[test]
    fn test_path_prefix() {
        let body = CLEAN.replace("com/example/app", "com/example/productreviewsystem");
        assert!(run(&PathPrefix, &body, SERVICE).is_some());
    }

    #[test]
    fn test_namespace_alignment() {
        let body = CLEAN.replace("package com.example.app.review;", "package com.example.app.reviews;");
        let message = run(&NamespaceAlignment, &body, SERVICE).unwrap();
        assert!(message.contains("com.example.app.reviews"));

        let body = CLEAN.replace("package com.example.app.review;", "");
        assert_eq!(
            run(&NamespaceAlignment, &body, SERVICE).as_deref(),
            Some("missing package declaration")
        );
    }

    #[test]
    fn test_placeholders() {
        for marker in [
            "// getters and setters",
            "// Implement this",
            "// implementation goes here",
            "// other methods",
            "// ...",
            "// add method",
            "// your code here",
            "// TODO: validate",
            "// to be implemented",
            "return stub;",
        ] {
            let body = CLEAN.replace("this.repository = repository;", &format!("this.repository = repository;\n        {}", marker));
            assert!(run(&NoPlaceholder, &body, SERVICE).is_some(), "{}", marker);
        }

        let body = CLEAN.replace("@Service", "// implemented per review guidelines\n@Service");
        assert_eq!(run(&NoPlaceholder, &body, SERVICE), None);

        let body = CLEAN.replace("return repository.save(review);", "...");
        assert!(run(&NoPlaceholder, &body, SERVICE).is_some());
        let body = CLEAN.replace("{\n        return repository.save(review);\n    }", "{ ... }");
        assert!(run(&NoPlaceholder, &body, SERVICE).is_some());
    }

    #[test]
    fn test_truncation() {
        let cut = &CLEAN[..CLEAN.len() - 10];
        assert!(run(&NoTruncation, cut, SERVICE).is_some());

        let body = CLEAN.replace("return repository.save(review);", "return repository.save(review);\n        g...");
        let message = run(&NoTruncation, &body, SERVICE).unwrap();
        assert!(message.contains("mid-token"));

        // Delimiters inside literals and comments do not count.
        let body = CLEAN.replace(
            "return repository.save(review);",
            "String s = \"}}((\"; char c = '{'; /* ) */ // {\n        return repository.save(review);",
        );
        assert_eq!(run(&NoTruncation, &body, SERVICE), None);

        let body = format!("{}\n// trailing comment", CLEAN);
        assert_eq!(run(&NoTruncation, &body, SERVICE), None);
    }

    #[test]
    fn test_truncation_ignores_closing_explanation() {
        let body = format!(
            "```java\n{}\n```\nThis class stores the reviews. It's wired through the repository.",
            CLEAN.trim_end()
        );
        assert!(draft(&body).body.ends_with("through the repository."));
        assert_eq!(run(&NoTruncation, &body, SERVICE), None);

        // Leftovers that read as code are still judged.
        let body = format!("{}\n    g...", CLEAN.trim_end());
        assert!(run(&NoTruncation, &body, SERVICE).is_some());
        let body = format!("{}\nclass Extra {{", CLEAN.trim_end());
        assert!(run(&NoTruncation, &body, SERVICE).is_some());
        let body = format!("{}\nreturnValue", CLEAN.trim_end());
        assert!(run(&NoTruncation, &body, SERVICE).is_some());
    }

    #[test]
    fn test_text_block_ignored_for_balance() {
        let body = CLEAN.replace(
            "return repository.save(review);",
            "String q = \"\"\"\n            SELECT { FROM (\n            \"\"\";\n        return repository.save(review);",
        );
        assert_eq!(run(&NoTruncation, &body, SERVICE), None);
    }

    #[test]
    fn test_field_injection_rejected() {
        let body = CLEAN.replace(
            "    private final ReviewRepository repository;",
            "    @Autowired\n    private ReviewRepository repository;",
        );
        assert!(run(&ConstructorInjection, &body, SERVICE).is_some());

        let body = CLEAN.replace(
            "    private final ReviewRepository repository;",
            "    @Inject @Named(\"primary\")\n    private ReviewRepository repository = null;",
        );
        assert!(run(&ConstructorInjection, &body, SERVICE).is_some());
    }

    #[test]
    fn test_constructor_injection_allowed() {
        let body = CLEAN.replace(
            "    public ReviewService(ReviewRepository repository) {",
            "    @Autowired(required = true)\n    public ReviewService(ReviewRepository repository) {",
        );
        assert_eq!(run(&ConstructorInjection, &body, SERVICE), None);

        let body = CLEAN.replace("@Service", "// @Autowired fields are not used here\n@Service");
        assert_eq!(run(&ConstructorInjection, &body, SERVICE), None);
    }

    #[test]
    fn test_layering() {
        let controller = "// FILE: src/main/java/com/example/app/review/ReviewController.java
package com.example.app.review;

@RestController
public class ReviewController {
    private final ReviewRepository repository;

    public ReviewController(ReviewRepository repository) {
        this.repository = repository;
    }
}";
        let target = "com.example.app.review.ReviewController";
        let message = run(&Layering, controller, target).unwrap();
        assert!(message.contains("ReviewRepository"));

        let through_service = controller.replace("ReviewRepository", "ReviewService");
        assert_eq!(run(&Layering, &through_service, target), None);

        // Services may use repositories.
        assert_eq!(run(&Layering, CLEAN, SERVICE), None);
    }
}
