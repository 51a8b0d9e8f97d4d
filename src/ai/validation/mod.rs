//! Structured Output Validation
//!
//! Recovery of JSON payloads from free-form model responses.

mod json_repair;

pub use json_repair::{JsonRepairer, parse_json_object};
