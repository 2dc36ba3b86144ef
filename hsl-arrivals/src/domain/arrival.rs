//! Upcoming arrivals at a stop.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::GtfsId;

/// One upcoming arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalEntry {
    /// Route short name, e.g. `550`.
    pub route: String,
    /// Full headsign of the trip, when the feed provides one.
    pub destination: Option<String>,
    /// Expected arrival (real-time when available, otherwise scheduled).
    pub arrival: DateTime<Utc>,
    /// Whether `arrival` comes from real-time data.
    pub realtime: bool,
}

/// Snapshot of upcoming arrivals for one subscription.
///
/// Rebuilt in full on every refresh and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteData {
    pub stop_name: String,
    pub stop_code: String,
    pub stop_gtfs_id: GtfsId,
    /// Sorted ascending by arrival time.
    arrivals: Vec<ArrivalEntry>,
    pub fetched_at: DateTime<Utc>,
}

impl RouteData {
    /// Build a snapshot, sorting arrivals by time.
    pub fn new(
        stop_name: impl Into<String>,
        stop_code: impl Into<String>,
        stop_gtfs_id: GtfsId,
        mut arrivals: Vec<ArrivalEntry>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        arrivals.sort_by(|a, b| a.arrival.cmp(&b.arrival).then_with(|| a.route.cmp(&b.route)));
        Self {
            stop_name: stop_name.into(),
            stop_code: stop_code.into(),
            stop_gtfs_id,
            arrivals,
            fetched_at,
        }
    }

    pub fn arrivals(&self) -> &[ArrivalEntry] {
        &self.arrivals
    }

    /// The next arrival.
    pub fn primary(&self) -> Option<&ArrivalEntry> {
        self.arrivals.first()
    }

    /// Arrivals after the primary one.
    pub fn upcoming(&self) -> &[ArrivalEntry] {
        self.arrivals.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }
}
