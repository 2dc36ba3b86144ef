//! Digitransit subscription key.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// A non-empty Digitransit API key.
///
/// The key is passed explicitly to every lookup; there is no process-wide
/// copy. `Debug` output is redacted so keys don't end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    /// Parse a key, trimming surrounding whitespace.
    ///
    /// Empty or whitespace-only input is rejected.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::MissingApiKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The raw key, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        let key = ApiKey::parse("  abc123 \n").unwrap();
        assert_eq!(key.expose(), "abc123");
    }

    #[test]
    fn rejects_blank() {
        assert_eq!(ApiKey::parse(""), Err(DomainError::MissingApiKey));
        assert_eq!(ApiKey::parse("   \t"), Err(DomainError::MissingApiKey));
    }

    #[test]
    fn debug_is_redacted() {
        let key = ApiKey::parse("secret").unwrap();
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
    }

    #[test]
    fn deserialize_rejects_blank() {
        assert!(serde_json::from_str::<ApiKey>("\"  \"").is_err());
        let key: ApiKey = serde_json::from_str("\"k\"").unwrap();
        assert_eq!(key.expose(), "k");
    }
}
