//! Contract Registry
//!
//! Method names of approved artifacts, fed forward into later developer
//! prompts so a service can call the repository methods that actually exist.

use regex::Regex;
use std::sync::LazyLock;

use super::types::TargetSpec;

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|protected|private|static|final|abstract|synchronized|default|native)\s+)*(?:<[^>]+>\s+)?([\w.$]+(?:<[^;(){}]*>)?(?:\[\])*)\s+(\w+)\s*\(",
    )
    .unwrap()
});

const NOT_A_TYPE: &[&str] = &["return", "new", "throw", "else", "case", "yield", "package", "import"];
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "synchronized", "return", "new"];

/// Public/protected/package method names declared in `body`, in order of
/// appearance, without duplicates. Private methods are not part of the
/// contract; constructors are skipped.
pub fn extract_methods(body: &str, local_name: &str) -> Vec<String> {
    let mut methods: Vec<String> = Vec::new();

    for caps in METHOD_RE.captures_iter(body) {
        let (Some(whole), Some(ty), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let ty = ty.as_str();
        let name = name.as_str();

        if NOT_A_TYPE.contains(&ty)
            || CONTROL_KEYWORDS.contains(&name)
            || name == local_name
            || whole.as_str().split_whitespace().any(|word| word == "private")
        {
            continue;
        }
        if !methods.iter().any(|m| m == name) {
            methods.push(name.to_string());
        }
    }
    methods
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractEntry {
    pub target: TargetSpec,
    pub methods: Vec<String>,
}

/// Ordered registry of approved targets and their methods
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    entries: Vec<ContractEntry>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `target`; position is kept on replace
    pub fn register(&mut self, target: TargetSpec, methods: Vec<String>) {
        match self.entries.iter_mut().find(|e| e.target == target) {
            Some(entry) => entry.methods = methods,
            None => self.entries.push(ContractEntry { target, methods }),
        }
    }

    pub fn contract(&self, target: &TargetSpec) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| &e.target == target)
            .map(|e| e.methods.as_slice())
    }

    pub fn contains(&self, target: &TargetSpec) -> bool {
        self.entries.iter().any(|e| &e.target == target)
    }

    pub fn all(&self) -> &[ContractEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per target: `a.b.C: m1, m2`
    pub fn render_context(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                if e.methods.is_empty() {
                    format!("{}: (no public methods)", e.target)
                } else {
                    format!("{}: {}", e.target, e.methods.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
