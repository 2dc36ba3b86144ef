//! Digitransit GraphQL response DTOs.
//!
//! These types map directly to the JSON shapes of the documents in
//! `queries`. GraphQL nullability is loose, so nearly everything is an
//! `Option`; `convert` decides which missing fields make a record unusable.

use serde::Deserialize;

/// Top-level GraphQL envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlErrorDto>,
}

/// One entry of the GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlErrorDto {
    pub message: String,
}

/// `data` of the `stops(...)` queries.
#[derive(Debug, Clone, Deserialize)]
pub struct StopsData {
    pub stops: Option<Vec<Option<StopDto>>>,
}

/// A stop, optionally with its routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopDto {
    pub gtfs_id: Option<String>,
    pub name: Option<String>,
    pub code: Option<String>,
    /// Only present in `StopDetail`.
    pub routes: Option<Vec<Option<RouteDto>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDto {
    pub short_name: Option<String>,
    pub patterns: Option<Vec<Option<PatternDto>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternDto {
    pub headsign: Option<String>,
}

/// `data` of the `stop(id:)` departures query.
#[derive(Debug, Clone, Deserialize)]
pub struct StopData {
    pub stop: Option<StopDeparturesDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopDeparturesDto {
    pub gtfs_id: Option<String>,
    pub name: Option<String>,
    pub code: Option<String>,
    pub stoptimes_without_patterns: Option<Vec<Option<StoptimeDto>>>,
}

/// A single stop time.
///
/// Arrival fields are seconds since `service_day`, which is the Unix time
/// of the service day's start (local noon minus 12 hours).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoptimeDto {
    pub service_day: Option<i64>,
    pub scheduled_arrival: Option<i64>,
    pub realtime_arrival: Option<i64>,
    pub realtime: Option<bool>,
    pub headsign: Option<String>,
    pub trip: Option<TripDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDto {
    pub trip_headsign: Option<String>,
    pub route: Option<TripRouteDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRouteDto {
    pub short_name: Option<String>,
}
