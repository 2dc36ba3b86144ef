//! Persisted subscription entry.

use serde::{Deserialize, Serialize};

use crate::domain::{
    ApiKey, DestinationFilter, GtfsId, RouteFilter, Selection, Stop, UniqueId, stop_label,
};

/// A created subscription, as persisted by the host.
///
/// Serialized with the field names `stopGtfsId`, `stopName`, `stopCode`,
/// `route`, `destination`, `apiKey` (plus `title`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub title: String,
    pub stop_gtfs_id: GtfsId,
    pub stop_name: String,
    pub stop_code: String,
    pub route: RouteFilter,
    pub destination: DestinationFilter,
    pub api_key: ApiKey,
}

impl ConfigEntry {
    /// Build an entry for a resolved stop, route and destination.
    pub fn new(
        stop: &Stop,
        route: RouteFilter,
        destination: DestinationFilter,
        api_key: ApiKey,
    ) -> Self {
        let selection = Selection::new(stop.gtfs_id.clone(), route, destination);
        let title = entry_title(&stop.name, &stop.code, &selection);

        Self {
            title,
            stop_gtfs_id: stop.gtfs_id.clone(),
            stop_name: stop.name.clone(),
            stop_code: stop.code.clone(),
            route: selection.route().clone(),
            destination: selection.destination().clone(),
            api_key,
        }
    }

    pub fn selection(&self) -> Selection {
        Selection::new(
            self.stop_gtfs_id.clone(),
            self.route.clone(),
            self.destination.clone(),
        )
    }

    pub fn unique_id(&self) -> UniqueId {
        self.selection().unique_id()
    }
}

/// Human-readable entry title.
///
/// - route `ALL`: `Kuusisaarentie (H1415) – ALL`
/// - destination `ALL`: `Kuusisaarentie (H1415) – 550 (ALL)`
/// - otherwise: `Kuusisaarentie (H1415) – 550 → Itäkeskus`
pub fn entry_title(stop_name: &str, stop_code: &str, selection: &Selection) -> String {
    let stop = stop_label(stop_name, stop_code);
    match (selection.route(), selection.destination()) {
        (RouteFilter::All, _) => format!("{stop} – ALL"),
        (RouteFilter::Route(route), DestinationFilter::All) => format!("{stop} – {route} (ALL)"),
        (RouteFilter::Route(route), DestinationFilter::Headsign(dest)) => {
            format!("{stop} – {route} → {dest}")
        }
    }
}
