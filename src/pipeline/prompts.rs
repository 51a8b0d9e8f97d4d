//! Role prompts for the planner, architect, developer and reviewer.

use std::collections::BTreeMap;

use super::types::{ArchitecturePlan, FeatureRequest, Plan, TargetSpec};
use crate::ai::prompt::PromptBuilder;
use crate::retrieval::Snippet;

pub fn planner_prompt(request: &FeatureRequest) -> String {
    PromptBuilder::new()
        .role(
            "PRODUCT MANAGER",
            "You work on a Java Spring Boot application. Turn the business request below into an engineering-ready feature plan.",
        )
        .section("Business Feature Request", &request.text)
        .rules(
            "Fields",
            &[
                "feature_name: short descriptive title",
                "scope: where the feature applies (e.g. Backend, Web application)",
                "entities: key domain objects",
                "services: services needed to support the feature",
                "controllers: API controllers handling user interaction",
                "repositories: data repositories to persist and retrieve data",
                "acceptance_criteria: specific, testable statements of done",
            ],
        )
        .section(
            "Output Format (STRICT JSON)",
            r#"{
  "feature_name": "...",
  "scope": ["..."],
  "entities": ["..."],
  "services": ["..."],
  "controllers": ["..."],
  "repositories": ["..."],
  "acceptance_criteria": ["..."]
}"#,
        )
        .text("Respond with the JSON object only.")
        .build()
}

pub fn architect_prompt(plan: &Plan) -> String {
    PromptBuilder::new()
        .role(
            "SOFTWARE ARCHITECT",
            "Take the feature plan from the product manager and produce a high-level technical design a developer can implement.",
        )
        .section("Feature Plan", &plan.render())
        .objectives(&[
            "Propose a clean Java package structure grouped by domain",
            "Define the classes and interfaces needed for the feature",
            "For each class, list its purpose, key fields and method signatures",
            "Define entity relationships (e.g. One-to-Many between Product and Review)",
            "Name the Spring patterns used (Repository, Service, MVC)",
            "Keep separation of concerns and domain-driven design",
        ])
        .rules(
            "Output Format",
            &[
                "Bullet points or markdown formatting",
                "Tree layout for the package structure",
                "Do not write code, only design and structure",
            ],
        )
        .build()
}

/// Inputs for one developer attempt
pub struct DeveloperPromptInput<'a> {
    pub plan: &'a Plan,
    pub architecture: &'a ArchitecturePlan,
    pub base_context: &'a BTreeMap<String, String>,
    pub namespace_root: &'a str,
    pub source_prefix: &'a str,
    pub target: &'a TargetSpec,
    /// `a.b.C: m1, m2` lines for already approved targets
    pub contracts: &'a str,
    pub snippets: &'a [Snippet],
    /// Reasons the previous attempt was not accepted
    pub feedback: &'a [String],
}

pub fn developer_prompt(input: &DeveloperPromptInput<'_>) -> String {
    let header = format!(
        "// FILE: {}/{}.java",
        input.source_prefix.trim_end_matches('/'),
        input.target.as_path()
    );

    let mut builder = PromptBuilder::new()
        .role(
            "senior Java Spring Boot developer",
            "You are adding a feature to an existing Spring Boot application, one file at a time.",
        )
        .section("Feature Plan", &input.plan.render())
        .section("Architectural Design", input.architecture.as_str());

    for (key, value) in input.base_context {
        builder = builder.context_item(key, value);
    }
    builder = builder
        .context_item("package_root", input.namespace_root)
        .section_if("Approved Contracts (call only these methods)", input.contracts)
        .section_if("Related Code", &render_snippets(input.snippets));

    let feedback: Vec<String> = input.feedback.iter().map(|f| format!("- {}", f)).collect();
    builder
        .section_if(
            "Previous Attempt Was Rejected",
            &feedback.join("\n"),
        )
        .section(
            "Task",
            &format!(
                "Write exactly one file: {} (package {}).",
                input.target,
                input.target.namespace()
            ),
        )
        .rules(
            "Guidelines",
            &[
                format!(
                    "Use the existing package structure under {}; do not invent a new root",
                    input.namespace_root
                ),
                "Every method has real logic; no TODO, stubs, ellipses or empty bodies".to_string(),
                "Controllers call services, services call repositories".to_string(),
                "Inject dependencies through the constructor; never @Autowired on fields".to_string(),
                "Use @RestController, @Service, @Repository, @Entity where appropriate".to_string(),
                "Do not create a Spring Boot application class".to_string(),
                "No markdown fences and no explanations".to_string(),
            ],
        )
        .example(&format!(
            "{}\npackage {};\n\npublic class {} {{\n    // complete implementation\n}}",
            header,
            input.target.namespace(),
            input.target.local_name()
        ))
        .text(&format!("The first line of your answer must be: {}", header))
        .build()
}

pub fn reviewer_prompt(plan: &Plan, code: &str, namespace_root: &str) -> String {
    let root_path = namespace_root.replace('.', "/");
    PromptBuilder::new()
        .role(
            "strict Java/Spring Boot code reviewer",
            "Review the developer's single-file submission against the feature plan.",
        )
        .section("Feature Plan", &plan.render())
        .section("Developer Submission", code)
        .rules(
            "Approve only if all checks pass",
            &[
                "A) Exactly one // FILE: header, on the first line; no markdown fences".to_string(),
                format!(
                    "B) Header path starts with src/main/java/{}/ and the package declaration equals the header directory",
                    root_path
                ),
                "C) No placeholders (getters and setters, add method, TODO, to be implemented, stub) and no truncation".to_string(),
                "D) Constructor injection only; no field-level @Autowired".to_string(),
                "E) Imports present for used types; annotations consistent".to_string(),
                "F) Controllers call services, services call repositories; no controller to repository calls".to_string(),
            ],
        )
        .section(
            "Output Format (STRICT JSON)",
            r#"{"status": "approved" or "rejected", "issues": ["short, concrete issues (empty if approved)"]}"#,
        )
        .build()
}

fn render_snippets(snippets: &[Snippet]) -> String {
    snippets
        .iter()
        .map(|s| format!("// {} ({})\n{}", s.label(), s.location, s.content.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
