//! Domain error types.
//!
//! These errors represent validation failures on user-supplied or
//! API-supplied identifiers. They are distinct from API/IO errors.

/// Domain-level errors for validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// API key was empty or whitespace only
    #[error("missing API key")]
    MissingApiKey,

    /// String is not a `PREFIX:digits` GTFS id
    #[error("invalid GTFS id {value:?}: {reason}")]
    InvalidGtfsId { value: String, reason: &'static str },
}
