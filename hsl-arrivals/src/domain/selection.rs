//! Subscription selection: stop, route filter, destination filter.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::GtfsId;

/// Wildcard literal meaning "no filter" for a route or destination.
pub const ALL: &str = "ALL";

/// Whether `s` is the `ALL` sentinel (case-insensitive).
pub fn is_all(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case(ALL)
}

/// Which routes of a stop a subscription follows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RouteFilter {
    All,
    Route(String),
}

impl RouteFilter {
    /// `ALL` (any case) becomes [`RouteFilter::All`], anything else a route name.
    pub fn parse(s: &str) -> Self {
        if is_all(s) {
            Self::All
        } else {
            Self::Route(s.trim().to_string())
        }
    }

    /// Case-insensitive match against a route short name.
    pub fn matches(&self, short_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Route(name) => name.to_lowercase() == short_name.to_lowercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL,
            Self::Route(name) => name,
        }
    }
}

impl From<String> for RouteFilter {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<RouteFilter> for String {
    fn from(f: RouteFilter) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for RouteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which destinations a subscription follows.
///
/// A headsign filter matches case-insensitively as a substring, so
/// `Itäkeskus` matches the headsign `Helsinki Itäkeskus`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DestinationFilter {
    All,
    Headsign(String),
}

impl DestinationFilter {
    /// `ALL` (any case) becomes [`DestinationFilter::All`], anything else a headsign.
    pub fn parse(s: &str) -> Self {
        if is_all(s) {
            Self::All
        } else {
            Self::Headsign(s.trim().to_string())
        }
    }

    /// Match against an arrival's headsign. Missing headsigns only pass `All`.
    pub fn matches(&self, headsign: Option<&str>) -> bool {
        match (self, headsign) {
            (Self::All, _) => true,
            (Self::Headsign(_), None) => false,
            (Self::Headsign(wanted), Some(actual)) => actual
                .to_lowercase()
                .contains(&wanted.to_lowercase()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL,
            Self::Headsign(h) => h,
        }
    }
}

impl From<String> for DestinationFilter {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<DestinationFilter> for String {
    fn from(f: DestinationFilter) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for DestinationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved (stop, route, destination) triple of a subscription.
///
/// Immutable once an entry is created; a different triple is a different
/// subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    stop: GtfsId,
    route: RouteFilter,
    destination: DestinationFilter,
}

impl Selection {
    /// Build a selection. Choosing `ALL` routes forces `ALL` destinations.
    pub fn new(stop: GtfsId, route: RouteFilter, destination: DestinationFilter) -> Self {
        let destination = match route {
            RouteFilter::All => DestinationFilter::All,
            RouteFilter::Route(_) => destination,
        };
        Self {
            stop,
            route,
            destination,
        }
    }

    pub fn stop(&self) -> &GtfsId {
        &self.stop
    }

    pub fn route(&self) -> &RouteFilter {
        &self.route
    }

    pub fn destination(&self) -> &DestinationFilter {
        &self.destination
    }

    pub fn unique_id(&self) -> UniqueId {
        UniqueId::for_selection(self)
    }
}

/// Deterministic identifier of a [`Selection`], used to reject duplicates.
///
/// Formatted as `gtfs/route/destination`. Wildcards render as `ALL`. Named
/// routes and headsigns escape `%` and `/`, and a name spelled exactly `ALL`
/// has its first letter escaped, so it never reads as the wildcard. GTFS ids
/// never contain `/`, so distinct selections always get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(String);

impl UniqueId {
    pub fn for_selection(selection: &Selection) -> Self {
        Self(format!(
            "{}/{}/{}",
            selection.stop.as_str(),
            route_component(&selection.route),
            destination_component(&selection.destination),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn route_component(route: &RouteFilter) -> String {
    match route {
        RouteFilter::All => ALL.to_string(),
        RouteFilter::Route(name) => escape_component(name),
    }
}

fn destination_component(destination: &DestinationFilter) -> String {
    match destination {
        DestinationFilter::All => ALL.to_string(),
        DestinationFilter::Headsign(headsign) => escape_component(headsign),
    }
}

fn escape_component(s: &str) -> String {
    if s == ALL {
        return "%41LL".to_string();
    }

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            _ => out.push(c),
        }
    }
    out
}
