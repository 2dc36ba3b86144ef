//! Digitransit client error types.

/// Errors from the GraphQL transport.
#[derive(Debug, thiserror::Error)]
pub enum DigitransitError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid API key or unauthorized
    #[error("unauthorized (invalid subscription key)")]
    Unauthorized,

    /// Rate limited by the API
    #[error("rate limited by Digitransit API")]
    RateLimited,

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Response body was not JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// GraphQL errors with no data
    #[error("GraphQL error: {}", .0.join("; "))]
    Graphql(Vec<String>),

    /// API key can't be sent as a header value
    #[error("invalid API key format")]
    InvalidHeader,
}
