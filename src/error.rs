//! Error types for SearchAgent

use thiserror::Error;

/// Result type alias using SearchAgent's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for SearchAgent
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM or search provider returned a failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider quota exhausted
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Provider rejected the credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A single page fetch failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The model kept requesting tools past the configured bound
    #[error("Tool loop limit exceeded after {0} rounds")]
    ToolLoopLimitExceeded(u32),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a reqwest failure, keeping timeouts distinct
    pub fn from_request(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(format!("{}: {}", context, err))
        } else {
            Error::Provider(format!("{}: {}", context, err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ToolLoopLimitExceeded(5);
        assert_eq!(err.to_string(), "Tool loop limit exceeded after 5 rounds");
    }
}
