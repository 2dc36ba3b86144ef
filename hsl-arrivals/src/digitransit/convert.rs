//! Conversion from Digitransit DTOs to domain types.
//!
//! Records missing a field we can't do without are skipped with a debug log
//! rather than failing the whole response.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{ArrivalEntry, GtfsId, Pattern, Route, Stop, StopDetail};

use super::types::{RouteDto, StopDeparturesDto, StopDto, StoptimeDto};

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// GTFS id in the response doesn't parse
    #[error("invalid GTFS id: {0}")]
    InvalidGtfsId(String),

    /// Arrival time out of range
    #[error("invalid arrival time: service day {service_day} + {offset}s")]
    InvalidTime { service_day: i64, offset: i64 },
}

/// A stop and its next arrivals, as returned by the departures query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopDepartures {
    pub stop: Stop,
    /// In API order; not filtered or sorted.
    pub arrivals: Vec<ArrivalEntry>,
}

/// Convert a stop identity record.
pub fn convert_stop(dto: &StopDto) -> Result<Stop, ConversionError> {
    let raw_id = dto
        .gtfs_id
        .as_deref()
        .ok_or(ConversionError::MissingField("gtfsId"))?;
    let gtfs_id =
        GtfsId::parse(raw_id).map_err(|_| ConversionError::InvalidGtfsId(raw_id.to_string()))?;
    let name = dto
        .name
        .clone()
        .ok_or(ConversionError::MissingField("name"))?;

    Ok(Stop {
        gtfs_id,
        name,
        code: dto.code.clone().unwrap_or_default(),
    })
}

/// Convert a list of stop records, skipping unusable ones.
pub fn convert_stops(dtos: &[Option<StopDto>]) -> Vec<Stop> {
    dtos.iter()
        .flatten()
        .filter_map(|dto| match convert_stop(dto) {
            Ok(stop) => Some(stop),
            Err(e) => {
                debug!(error = %e, "Skipping malformed stop record");
                None
            }
        })
        .collect()
}

/// Convert a stop record that includes routes.
///
/// Routes without a short name are dropped.
pub fn convert_stop_detail(dto: &StopDto) -> Result<StopDetail, ConversionError> {
    let stop = convert_stop(dto)?;
    let routes = dto
        .routes
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .flatten()
        .filter_map(convert_route)
        .collect();

    Ok(StopDetail { stop, routes })
}

fn convert_route(dto: &RouteDto) -> Option<Route> {
    let short_name = dto.short_name.clone().filter(|s| !s.is_empty())?;
    let patterns = dto
        .patterns
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .flatten()
        .map(|p| Pattern {
            headsign: p.headsign.clone(),
        })
        .collect();

    Some(Route {
        short_name,
        patterns,
    })
}

/// Convert a departures response, skipping unusable stop times.
pub fn convert_departures(dto: &StopDeparturesDto) -> Result<StopDepartures, ConversionError> {
    let stop = convert_stop(&StopDto {
        gtfs_id: dto.gtfs_id.clone(),
        name: dto.name.clone(),
        code: dto.code.clone(),
        routes: None,
    })?;

    let arrivals = dto
        .stoptimes_without_patterns
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .flatten()
        .filter_map(|st| match convert_stoptime(st) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(stop = %stop.gtfs_id, error = %e, "Skipping malformed stop time");
                None
            }
        })
        .collect();

    Ok(StopDepartures { stop, arrivals })
}

/// Convert one stop time into an arrival.
///
/// Uses the real-time arrival when the feed marks the stop time as
/// real-time, the scheduled arrival otherwise. The stop time's headsign
/// wins over the trip headsign.
pub fn convert_stoptime(dto: &StoptimeDto) -> Result<ArrivalEntry, ConversionError> {
    let trip = dto.trip.as_ref().ok_or(ConversionError::MissingField("trip"))?;
    let route = trip
        .route
        .as_ref()
        .and_then(|r| r.short_name.clone())
        .ok_or(ConversionError::MissingField("trip.route.shortName"))?;
    let service_day = dto
        .service_day
        .ok_or(ConversionError::MissingField("serviceDay"))?;

    let realtime = dto.realtime.unwrap_or(false);
    let offset = if realtime {
        dto.realtime_arrival.or(dto.scheduled_arrival)
    } else {
        dto.scheduled_arrival
    }
    .ok_or(ConversionError::MissingField("scheduledArrival"))?;

    let arrival = service_day
        .checked_add(offset)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or(ConversionError::InvalidTime {
            service_day,
            offset,
        })?;

    let destination = dto
        .headsign
        .clone()
        .or_else(|| trip.trip_headsign.clone())
        .filter(|h| !h.is_empty());

    Ok(ArrivalEntry {
        route,
        destination,
        arrival,
        realtime,
    })
}
