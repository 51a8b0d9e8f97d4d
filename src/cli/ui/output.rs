use console::style;

use crate::pipeline::{AttemptRecord, AttemptState, PipelineOutput};
use crate::persist::PersistReport;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Per-target attempt table of a finished run
    pub fn pipeline_summary(&self, output: &PipelineOutput) {
        self.section(&format!("Feature: {}", output.plan.feature_name));
        for report in &output.reports {
            println!(
                "  {} {:<48} {}",
                style("✓").green(),
                report.target.fqcn(),
                style(attempt_trail(&report.attempts)).dim()
            );
        }
        println!();
        println!(
            "  {} artifacts, {} attempts, session {}",
            output.artifacts.len(),
            output.total_attempts(),
            output.session_id
        );
    }

    pub fn persist_summary(&self, report: &PersistReport) {
        for path in &report.written {
            self.success(&format!("Wrote {}", path.display()));
        }
        for skipped in &report.skipped {
            self.warning(&format!("Skipped {}: {}", skipped.header_path, skipped.reason));
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

/// `1:policy-violation 2:approved`
fn attempt_trail(attempts: &[AttemptRecord]) -> String {
    attempts
        .iter()
        .map(|a| match (&a.cause, a.reached) {
            (Some(cause), _) => format!("{}:{}", a.attempt, cause.label()),
            (None, AttemptState::Approved) => format!("{}:approved", a.attempt),
            (None, state) => format!("{}:{:?}", a.attempt, state).to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
