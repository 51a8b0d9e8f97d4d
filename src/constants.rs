//! Global Constants
//!
//! Centralized constants for configuration defaults and tuning.
//! All magic numbers should be defined here with documentation.

/// Generation pipeline constants
pub mod pipeline {
    /// Default attempt budget per target before it is abandoned
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Default namespace root every generated artifact must live under
    pub const DEFAULT_NAMESPACE_ROOT: &str = "com.example.userproductapp";

    /// Source tree prefix for generated Java files
    pub const SOURCE_PREFIX: &str = "src/main/java";

    /// File extension of generated artifacts
    pub const ARTIFACT_EXTENSION: &str = "java";

    /// Namespace roots that models are known to drift towards
    pub const DRIFT_ROOTS: &[&str] = &["com.example.productreviewsystem"];

    /// Snippets pulled from the retrieval index per developer prompt
    pub const DEFAULT_RETRIEVAL_K: usize = 10;

    /// Package used for derived targets when the plan names no entity
    pub const DEFAULT_FEATURE_PACKAGE: &str = "feature";

    /// Longest feature slug derived from a request
    pub const FEATURE_ID_MAX_LEN: usize = 48;
}

/// Model provider retry constants
pub mod retry {
    /// Maximum retries for a single capability call
    pub const DEFAULT_MAX_RETRIES: usize = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Transcript constants
pub mod transcript {
    /// Default directory holding one sub-directory per session
    pub const DEFAULT_LOG_DIR: &str = "logs";

    /// Prefix of session directory names
    pub const SESSION_PREFIX: &str = "run";

    /// Hex characters of random suffix in a session id
    pub const SESSION_SUFFIX_LEN: usize = 6;
}

/// Source analysis constants
pub mod analysis {
    /// Maximum source file size to parse (2MB)
    pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

    /// Build and IDE folders never scanned
    pub const SKIP_DIRS: &[&str] = &["target", "build", "out", ".idea", ".git"];
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
