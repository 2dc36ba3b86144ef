//! Read-only sensor view over a coordinator's arrivals.
//!
//! The sensor holds no state of its own: every value is projected from the
//! coordinator's latest `RouteData` when asked for.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::coordinator::{ArrivalCoordinator, Published, UpdateStatus};
use crate::digitransit::GraphqlTransport;
use crate::domain::{ArrivalEntry, RouteData, UniqueId};

pub const ATTRIBUTION: &str = "Data provided by HSL / Digitransit";

/// Device identifier namespace.
pub const DEVICE_DOMAIN: &str = "hslhrt";

pub const ENTITY_NAME: &str = "Route";
pub const ICON: &str = "mdi:bus";

const UNAVAILABLE: &str = "Unavailable";

/// Sensor state: the primary arrival's route, or `None` without arrivals.
pub fn primary_value(data: Option<&RouteData>) -> Option<String> {
    data.and_then(RouteData::primary).map(|a| a.route.clone())
}

/// Sensor attributes.
///
/// Without arrivals only `attribution` is present.
pub fn attributes(data: Option<&RouteData>) -> Map<String, Value> {
    let mut attrs = Map::new();

    if let Some(data) = data
        && let Some(primary) = data.primary()
    {
        attrs.extend(arrival_attributes(primary));
        attrs.insert(
            "ROUTES".to_string(),
            data.upcoming()
                .iter()
                .map(|a| Value::Object(arrival_attributes(a)))
                .collect(),
        );
        attrs.insert("stop_name".to_string(), json!(data.stop_name));
        attrs.insert("stop_code".to_string(), json!(data.stop_code));
        attrs.insert("stop_gtfs".to_string(), json!(data.stop_gtfs_id.as_str()));
    }

    attrs.insert("attribution".to_string(), json!(ATTRIBUTION));
    attrs
}

fn arrival_attributes(arrival: &ArrivalEntry) -> Map<String, Value> {
    let mut attrs = Map::new();
    attrs.insert("route".to_string(), json!(arrival.route));
    attrs.insert(
        "destination".to_string(),
        json!(arrival.destination.as_deref().unwrap_or(UNAVAILABLE)),
    );
    attrs.insert("arrival_time".to_string(), json!(arrival.arrival.to_rfc3339()));
    attrs
}

/// Device grouping for the sensor: one device per stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

/// Everything a host needs to render the sensor at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub unique_id: UniqueId,
    pub title: String,
    pub name: &'static str,
    pub icon: &'static str,
    pub state: Option<String>,
    pub available: bool,
    pub attributes: Map<String, Value>,
    pub device_info: DeviceInfo,
    pub status: UpdateStatus,
}

/// Route sensor for one subscription.
pub struct RouteSensor<T> {
    coordinator: Arc<ArrivalCoordinator<T>>,
    unique_id: UniqueId,
}

impl<T: GraphqlTransport> RouteSensor<T> {
    pub fn new(coordinator: Arc<ArrivalCoordinator<T>>) -> Self {
        let unique_id = coordinator.entry().unique_id();
        Self {
            coordinator,
            unique_id,
        }
    }

    pub fn unique_id(&self) -> &UniqueId {
        &self.unique_id
    }

    pub fn name(&self) -> &'static str {
        ENTITY_NAME
    }

    pub fn icon(&self) -> &'static str {
        ICON
    }

    pub fn coordinator(&self) -> &Arc<ArrivalCoordinator<T>> {
        &self.coordinator
    }

    pub async fn primary_value(&self) -> Option<String> {
        primary_value(self.coordinator.route_data().await.as_deref())
    }

    pub async fn attributes(&self) -> Map<String, Value> {
        attributes(self.coordinator.route_data().await.as_deref())
    }

    /// Whether the last refresh succeeded.
    pub async fn available(&self) -> bool {
        self.coordinator.status().await.last_update_success
    }

    pub async fn device_info(&self) -> DeviceInfo {
        let data = self.coordinator.route_data().await;
        self.device_info_for(data.as_deref())
    }

    /// Read all sensor values from one consistent data/status pair.
    pub async fn snapshot(&self) -> SensorSnapshot {
        let Published { data, status } = self.coordinator.published().await;

        SensorSnapshot {
            unique_id: self.unique_id.clone(),
            title: self.coordinator.entry().title.clone(),
            name: ENTITY_NAME,
            icon: ICON,
            state: primary_value(data.as_deref()),
            available: status.last_update_success,
            attributes: attributes(data.as_deref()),
            device_info: self.device_info_for(data.as_deref()),
            status,
        }
    }

    fn device_info_for(&self, data: Option<&RouteData>) -> DeviceInfo {
        let entry = self.coordinator.entry();
        let name = data
            .map(|d| d.stop_name.clone())
            .unwrap_or_else(|| entry.stop_name.clone());

        DeviceInfo {
            identifiers: vec![(
                DEVICE_DOMAIN.to_string(),
                entry.stop_gtfs_id.as_str().to_string(),
            )],
            name,
            manufacturer: "HSL / Digitransit",
            model: "Routing API v2",
        }
    }
}
