//! Prompt Builder
//!
//! Standardized prompt construction shared by the four pipeline roles.
//! Sections render in insertion order so the same inputs always produce the
//! same prompt text (transcripts stay diffable between runs).

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition
    Role { title: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Ordered key-value context
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Hard rules the output must satisfy
    Rules { header: String, rules: Vec<String> },
    /// Verbatim example of the expected output
    Example(String),
    /// Custom section
    Custom(String),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, title: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            title: title.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives<S: AsRef<str>>(mut self, objectives: &[S]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|s| s.as_ref().to_string()).collect(),
        ));
        self
    }

    /// Add a context item, appended to the existing context section if any
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let entry = (key.to_string(), value.to_string());
        for section in &mut self.sections {
            if let PromptSection::Context(items) = section {
                items.push(entry);
                return self;
            }
        }
        self.sections.push(PromptSection::Context(vec![entry]));
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Section only when `content` is non-empty
    pub fn section_if(self, header: &str, content: &str) -> Self {
        if content.trim().is_empty() {
            self
        } else {
            self.section(header, content)
        }
    }

    pub fn rules<S: AsRef<str>>(mut self, header: &str, rules: &[S]) -> Self {
        self.sections.push(PromptSection::Rules {
            header: header.to_string(),
            rules: rules.iter().map(|s| s.as_ref().to_string()).collect(),
        });
        self
    }

    pub fn example(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Example(content.to_string()));
        self
    }

    pub fn custom(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Custom(content.to_string()));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { title, task } => {
                    prompt.push_str(&format!("You are the {}. {}\n\n", title, task));
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(items) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in items {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(content.trim_end());
                    prompt.push_str("\n\n");
                }
                PromptSection::Rules { header, rules } => {
                    prompt.push_str(&format!("# {}\n\n", header));
                    for rule in rules {
                        prompt.push_str(&format!("- {}\n", rule));
                    }
                    prompt.push('\n');
                }
                PromptSection::Example(content) => {
                    prompt.push_str("Example:\n");
                    prompt.push_str(content.trim_end());
                    prompt.push_str("\n\n");
                }
                PromptSection::Custom(content) => {
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}
