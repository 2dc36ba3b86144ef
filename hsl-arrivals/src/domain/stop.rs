//! Stops, routes and patterns as returned by the lookup layer.

use serde::{Deserialize, Serialize};

use super::GtfsId;

/// A transit stop. Identity is the GTFS id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub gtfs_id: GtfsId,
    pub name: String,
    /// Short rider-facing code, e.g. `H1415`. Empty when the feed has none.
    pub code: String,
}

impl Stop {
    /// Create a stop.
    pub fn new(gtfs_id: GtfsId, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            gtfs_id,
            name: name.into(),
            code: code.into(),
        }
    }

    /// Display label: `"name (code)"`, or just the name when there is no code.
    pub fn label(&self) -> String {
        stop_label(&self.name, &self.code)
    }
}

/// Format a stop's display label from its name and code.
pub fn stop_label(name: &str, code: &str) -> String {
    if code.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({code})")
    }
}

/// A distinct direction or variant of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub headsign: Option<String>,
}

/// A route serving a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub short_name: String,
    pub patterns: Vec<Pattern>,
}

impl Route {
    /// Non-empty headsigns of this route's patterns, in pattern order.
    pub fn headsigns(&self) -> impl Iterator<Item = &str> {
        self.patterns
            .iter()
            .filter_map(|p| p.headsign.as_deref())
            .filter(|h| !h.is_empty())
    }
}

/// Full detail for one stop: identity plus the routes serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopDetail {
    pub stop: Stop,
    pub routes: Vec<Route>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> GtfsId {
        GtfsId::parse(s).unwrap()
    }

    #[test]
    fn label_with_and_without_code() {
        let stop = Stop::new(id("HSL:1"), "Kuusisaarentie", "H1415");
        assert_eq!(stop.label(), "Kuusisaarentie (H1415)");

        let stop = Stop::new(id("HSL:2"), "Kuusisaarentie", "");
        assert_eq!(stop.label(), "Kuusisaarentie");
    }

    #[test]
    fn headsigns_skip_missing_and_empty() {
        let route = Route {
            short_name: "550".into(),
            patterns: vec![
                Pattern {
                    headsign: Some("Itäkeskus".into()),
                },
                Pattern { headsign: None },
                Pattern {
                    headsign: Some(String::new()),
                },
                Pattern {
                    headsign: Some("Westendinasema".into()),
                },
            ],
        };

        let heads: Vec<&str> = route.headsigns().collect();
        assert_eq!(heads, vec!["Itäkeskus", "Westendinasema"]);
    }
}
