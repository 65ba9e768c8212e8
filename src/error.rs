//! Error types shared by every fetch and sink stage.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while fetching provider data or writing it out.
#[derive(Debug, Error)]
pub enum Error {
    /// A required environment variable is missing or empty.
    #[error("configuration error: {0}")]
    Config(String),

    /// A token endpoint answered with a non-success status.
    #[error("authentication failed ({status}): {body}")]
    Auth { status: u16, body: String },

    /// HTTP 429 or a provider throttling code. Consumed by the retry loop.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other non-success response.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The rate-limit retry budget ran out.
    #[error("{operation} failed after {attempts} attempts due to rate limiting")]
    RetriesExhausted { operation: String, attempts: u32 },

    /// The response parsed but did not have the expected shape.
    #[error("unexpected response: {0}")]
    Response(String),

    /// Writing or uploading output failed.
    #[error("sink error: {0}")]
    Sink(String),

    /// AWS SDK failure that is not throttling.
    #[error("AWS error: {0}")]
    Aws(String),

    /// Signing a service-account assertion failed.
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for a missing environment variable.
    pub fn missing_var(name: &str) -> Self {
        Error::Config(format!("missing environment variable {name}"))
    }
}
