//! JSON Repair
//!
//! Planner and reviewer roles are asked for strict JSON but local models
//! routinely wrap it in prose or fences, leave trailing commas, or stop
//! before the closing brace. This module recovers the first JSON object it
//! can find, repairing the common damage.
//!
//! Handles:
//! - Markdown code fences (```json ... ```), anywhere in the text
//! - JSON embedded in explanatory text
//! - Trailing commas
//! - Missing closing braces/brackets
//! - Strings cut off at a line break
//! - Stray control characters

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{DraftsmithError, Result};

// =============================================================================
// Convenience Functions
// =============================================================================

/// Parse the first JSON object in a model response.
///
/// `stage` names the role in the resulting error.
pub fn parse_json_object(raw: &str, stage: &str) -> Result<Map<String, Value>> {
    match JsonRepairer::new().parse_or_repair(raw) {
        Ok((Value::Object(map), _)) => Ok(map),
        Ok((other, _)) => Err(DraftsmithError::unparseable(
            stage,
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
        Err(e) => Err(DraftsmithError::unparseable(stage, e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// JsonRepairer
// =============================================================================

/// JSON repair strategies, tried from least to most invasive
pub struct JsonRepairer {
    max_repair_level: usize,
}

impl Default for JsonRepairer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRepairer {
    pub fn new() -> Self {
        Self {
            max_repair_level: 3,
        }
    }

    /// Parse JSON, attempting repair if the plain parse fails.
    ///
    /// Returns (Value, was_repaired)
    pub fn parse_or_repair(&self, raw: &str) -> Result<(Value, bool)> {
        let cleaned = preprocess(raw);
        if cleaned.is_empty() {
            return Err(DraftsmithError::unparseable("json", "empty response"));
        }

        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            return Ok((value, false));
        }

        // Prose around the payload is the most common failure; isolate the
        // first balanced value before repairing anything.
        let candidate = extract_balanced(&cleaned).unwrap_or_else(|| {
            cleaned
                .find(['{', '['])
                .map(|start| cleaned[start..].to_string())
                .unwrap_or_else(|| cleaned.clone())
        });

        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            debug!("JSON extracted from surrounding text");
            return Ok((value, true));
        }

        for level in 1..=self.max_repair_level {
            let repaired = repair(&candidate, level);
            if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
                debug!(level, "JSON repaired");
                return Ok((value, true));
            }
        }

        Err(DraftsmithError::unparseable(
            "json",
            format!(
                "no parseable JSON after {} repair levels; preview: {}",
                self.max_repair_level,
                cleaned.chars().take(160).collect::<String>()
            ),
        ))
    }
}

// =============================================================================
// Repair Steps
// =============================================================================

fn preprocess(raw: &str) -> String {
    let without_fences: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");
    without_fences
        .trim()
        .trim_start_matches('\u{feff}')
        .trim()
        .to_string()
}

fn repair(s: &str, level: usize) -> String {
    let mut result = fix_trailing_commas(s);
    if level >= 2 {
        result = close_strings_at_newline(&result);
    }
    if level >= 3 {
        result = result
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
            .collect();
    }
    // Trailing commas can reappear once closers are appended.
    fix_trailing_commas(&balance_closers(&result))
}

fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            result.push(ch);
            match ch {
                _ if escape => escape = false,
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        result.push(ch);
    }
    result
}

/// Append the closers for every still-open string, array and object
fn balance_closers(s: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if in_string {
            match ch {
                _ if escape => escape = false,
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut result = s.trim_end().to_string();
    if in_string {
        result.push('"');
    }
    while let Some(closer) = stack.pop() {
        result.push(closer);
    }
    result
}

fn close_strings_at_newline(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if in_string {
            match ch {
                _ if escape => escape = false,
                '\\' => escape = true,
                '"' => in_string = false,
                '\n' | '\r' => {
                    result.push('"');
                    in_string = false;
                }
                _ => {}
            }
        } else if ch == '"' {
            in_string = true;
        }
        result.push(ch);
    }
    if in_string {
        result.push('"');
    }
    result
}

/// First complete `{...}` or `[...]` in `s`, respecting string literals
fn extract_balanced(s: &str) -> Option<String> {
    let start = s.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if in_string {
            match ch {
                _ if escape => escape = false,
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(s[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let (_, repaired) = JsonRepairer::new()
            .parse_or_repair(r#"{"status": "approved"}"#)
            .unwrap();
        assert!(!repaired);
    }

    #[test]
    fn test_fenced_json_inside_prose() {
        let input = "Here is my review:\n```json\n{\"status\": \"rejected\", \"issues\": [\"x\"]}\n```\nThanks";
        let map = parse_json_object(input, "reviewer").unwrap();
        assert_eq!(map["status"], "rejected");
    }

    #[test]
    fn test_fix_trailing_comma() {
        let input = r#"{"entities": ["Review", "Product",], "scope": "Backend",}"#;
        let (value, repaired) = JsonRepairer::new().parse_or_repair(input).unwrap();
        assert!(repaired);
        assert_eq!(value["entities"][1], "Product");
    }

    #[test]
    fn test_missing_closers() {
        let input = r#"{"feature_name": "Reviews", "entities": ["Review""#;
        let (value, repaired) = JsonRepairer::new().parse_or_repair(input).unwrap();
        assert!(repaired);
        assert_eq!(value["entities"][0], "Review");
    }

    #[test]
    fn test_comma_inside_string_is_kept() {
        let input = r#"{"issues": ["a, ]b"],}"#;
        let (value, _) = JsonRepairer::new().parse_or_repair(input).unwrap();
        assert_eq!(value["issues"][0], "a, ]b");
    }

    #[test]
    fn test_non_object_is_unparseable() {
        let err = parse_json_object("[1, 2]", "planner").unwrap_err();
        assert!(matches!(err, DraftsmithError::UnparseableOutput { ref stage, .. } if stage == "planner"));
    }

    #[test]
    fn test_plain_prose_is_unparseable() {
        assert!(parse_json_object("Looks good to me, approved!", "reviewer").is_err());
        assert!(parse_json_object("", "reviewer").is_err());
    }
}
