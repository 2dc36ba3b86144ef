//! GTFS stop identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// A valid GTFS stop id of the form `PREFIX:digits`.
///
/// The prefix is one or more ASCII letters naming the feed (`HSL`), the
/// suffix one or more ASCII digits. Any `GtfsId` value is valid by
/// construction.
///
/// # Examples
///
/// ```
/// use hsl_arrivals::domain::GtfsId;
///
/// let id = GtfsId::parse("HSL:1303298").unwrap();
/// assert_eq!(id.feed(), "HSL");
/// assert_eq!(id.as_str(), "HSL:1303298");
///
/// // Stop codes and names are not ids
/// assert!(GtfsId::parse("H1415").is_err());
/// assert!(GtfsId::parse("Kuusisaarentie").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GtfsId {
    value: String,
    colon: usize,
}

impl GtfsId {
    /// Parse a GTFS id, rejecting anything that is not exactly `PREFIX:digits`.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let invalid = |reason| DomainError::InvalidGtfsId {
            value: s.to_string(),
            reason,
        };

        let colon = s.find(':').ok_or_else(|| invalid("missing ':' separator"))?;
        let (feed, rest) = (&s[..colon], &s[colon + 1..]);

        if feed.is_empty() {
            return Err(invalid("empty feed prefix"));
        }
        if !feed.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(invalid("feed prefix must be ASCII letters"));
        }
        if rest.is_empty() {
            return Err(invalid("empty stop number"));
        }
        if !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("stop number must be ASCII digits"));
        }

        Ok(Self {
            value: s.to_string(),
            colon,
        })
    }

    /// Whether `s` looks like a GTFS id (and should bypass name search).
    pub fn matches(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    /// The feed prefix, e.g. `HSL`.
    pub fn feed(&self) -> &str {
        &self.value[..self.colon]
    }

    /// The full id string.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl TryFrom<String> for GtfsId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GtfsId> for String {
    fn from(id: GtfsId) -> Self {
        id.value
    }
}

impl fmt::Debug for GtfsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GtfsId({})", self.value)
    }
}

impl fmt::Display for GtfsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
