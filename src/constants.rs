//! Global Constants
//!
//! Centralized constants for provider, vault and probe tuning.
//! All magic numbers should be defined here with documentation.

/// Gemini provider constants
pub mod gemini {
    /// Provider identifier used in logs, errors and the provider table
    pub const PROVIDER_NAME: &str = "gemini";

    /// Default API root (already carries the version segment)
    pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Version segment appended to a custom API base when credentials are resolved
    pub const API_VERSION_SUFFIX: &str = "/v1beta";

    /// Header carrying the API key (keeps the key out of request URLs)
    pub const API_KEY_HEADER: &str = "x-goog-api-key";

    /// Fallback max_tokens ceiling for models missing from the catalog
    pub const DEFAULT_MAX_TOKENS_CEILING: u32 = 4097;

    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Default connect timeout (seconds)
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Credential vault constants
pub mod vault {
    /// AES-256-GCM nonce size (96 bits)
    pub const NONCE_SIZE: usize = 12;

    /// AES-GCM authentication tag size
    pub const TAG_SIZE: usize = 16;

    /// Mask character used for obfuscated secrets
    pub const MASK_CHAR: char = '*';

    /// Narrowest obfuscation mask
    pub const MIN_MASK_WIDTH: usize = 3;

    /// Widest obfuscation mask
    pub const MAX_MASK_WIDTH: usize = 24;
}

/// Live credential probe constants
pub mod probe {
    /// Model used for the credential round-trip
    pub const MODEL: &str = "gemini-pro";

    /// Prompt sent by the probe
    pub const PROMPT: &str = "ping";

    pub const TEMPERATURE: f64 = 0.9;
    pub const TOP_P: f64 = 1.0;
    pub const TOP_K: u32 = 1;

    /// Output tokens requested by the probe; one token is enough to prove the key works
    pub const MAX_OUTPUT_TOKENS: u32 = 1;
}
