pub mod error;
pub mod utils;

pub use error::{DraftsmithError, ErrorCategory, ErrorClassifier, LlmError, Result, ResultExt};
pub use utils::{
    json_string, json_string_list, log_filter_error, log_filter_warn, slugify, split_terms,
};
