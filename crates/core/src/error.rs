//! Error types for the ZooGent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external capability has its own error type; the top-level [`Error`]
//! is what a failed turn surfaces to the caller.

use thiserror::Error;

/// The top-level error type for all ZooGent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM transport ---
    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] ProviderError),

    // --- Output parsing ---
    #[error("Malformed model output: {0}")]
    MalformedOutput(#[from] MalformedOutputError),

    // --- Search transport ---
    #[error("Search backend error: {0}")]
    SearchBackend(#[from] SearchError),

    // --- Pipeline outcome ---
    #[error("Empty request: describe what you want to buy")]
    EmptyRequest,

    #[error("No products found for '{query}' after all fallbacks")]
    NoResults { query: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Search quota exceeded")]
    QuotaExceeded,

    #[error("Search backend not configured: {0}")]
    NotConfigured(String),

    #[error("Search timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid search response: {0}")]
    InvalidResponse(String),

    #[error("All {attempted} searches failed, last error: {last}")]
    AllFailed { attempted: usize, last: String },
}

/// Raised when model text cannot be decoded into the shape its role declares.
#[derive(Debug, Clone, Error)]
pub enum MalformedOutputError {
    #[error("No JSON object found in model output")]
    NoJsonObject,

    #[error("Invalid JSON in model output: {0}")]
    InvalidJson(String),

    #[error("Unexpected JSON shape: {0}")]
    UnexpectedShape(String),
}
