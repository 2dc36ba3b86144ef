//! Stop, route and destination lookups.
//!
//! `TransitDirectory` turns free-text input into stops, and stops into
//! routes and destination headsigns. The infallible lookups (`find_stops`,
//! `routes_for_stop`, `destinations_for_route`) never surface errors: a
//! transport failure and "nothing found" both come back as an empty list,
//! and only the logs tell them apart. Callers that need the difference use
//! `stop_detail` and `stop_departures`.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::cache::{CacheConfig, StopDetailCache};
use crate::digitransit::{
    DigitransitError, GraphqlResponse, GraphqlTransport, StopData, StopDepartures, StopsData,
    convert_departures, convert_stop_detail, convert_stops, queries, request_headers,
};
use crate::domain::{ALL, ApiKey, GtfsId, Route, Stop, StopDetail, is_all};

/// Why a fallible lookup produced no result.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Request didn't complete; worth retrying later
    #[error("transport failure: {0}")]
    Transport(#[from] DigitransitError),

    /// Response was missing fields we need
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The API doesn't know this stop
    #[error("stop {0} not found")]
    StopNotFound(GtfsId),
}

impl LookupError {
    /// Transient failures leave cached data in place; the rest mean "no data".
    pub fn is_transport(&self) -> bool {
        matches!(self, LookupError::Transport(_))
    }
}

/// Lookup layer over a GraphQL transport.
///
/// Holds no per-caller state: the API key travels with each call, so one
/// directory can serve any number of concurrent sessions.
pub struct TransitDirectory<T> {
    transport: T,
    cache: Option<StopDetailCache>,
}

impl<T: GraphqlTransport> TransitDirectory<T> {
    /// Create a directory without a detail cache.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cache: None,
        }
    }

    /// Cache successful stop detail lookups.
    pub fn with_cache(mut self, config: &CacheConfig) -> Self {
        self.cache = Some(StopDetailCache::new(config));
        self
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Find stops matching a GTFS id or a free-text name.
    ///
    /// A GTFS id (`HSL:1303298`) is looked up directly with a single call.
    /// Anything else is searched by name verbatim, then upper-cased, then
    /// lower-cased, and the first non-empty result wins.
    pub async fn find_stops(&self, api_key: &ApiKey, query: &str) -> Vec<Stop> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        if let Ok(id) = GtfsId::parse(query) {
            return match self.stops_by_id(api_key, &id).await {
                Ok(stops) => {
                    if stops.is_empty() {
                        debug!(stop = %id, "No stop with this id");
                    }
                    stops
                }
                Err(e) => {
                    log_lookup_failure(&e, query);
                    Vec::new()
                }
            };
        }

        for attempt in [
            query.to_string(),
            query.to_uppercase(),
            query.to_lowercase(),
        ] {
            match self.stops_by_name(api_key, &attempt).await {
                Ok(stops) if !stops.is_empty() => return stops,
                Ok(_) => debug!(query = %attempt, "No stops found"),
                Err(e) => log_lookup_failure(&e, &attempt),
            }
        }

        Vec::new()
    }

    /// Routes serving a stop. Empty if the stop is unknown or the lookup fails.
    pub async fn routes_for_stop(&self, api_key: &ApiKey, stop: &GtfsId) -> Vec<Route> {
        match self.stop_detail(api_key, stop).await {
            Ok(detail) => detail.routes.clone(),
            Err(e) => {
                log_lookup_failure(&e, stop.as_str());
                Vec::new()
            }
        }
    }

    /// Destination headsigns of a route at a stop.
    ///
    /// Returns `["ALL"]` without querying when `route` is the `ALL`
    /// sentinel, and as a fallback when no headsign is found. Otherwise the
    /// result is sorted and free of duplicates.
    pub async fn destinations_for_route(
        &self,
        api_key: &ApiKey,
        stop: &GtfsId,
        route: &str,
    ) -> Vec<String> {
        if is_all(route) {
            return vec![ALL.to_string()];
        }

        let wanted = route.trim().to_lowercase();
        let headsigns: BTreeSet<String> = self
            .routes_for_stop(api_key, stop)
            .await
            .iter()
            .filter(|r| r.short_name.to_lowercase() == wanted)
            .flat_map(|r| r.headsigns().map(str::to_string))
            .collect();

        if headsigns.is_empty() {
            debug!(stop = %stop, route, "No destinations found, offering ALL");
            return vec![ALL.to_string()];
        }

        headsigns.into_iter().collect()
    }

    /// Full stop detail (identity, routes, patterns).
    pub async fn stop_detail(
        &self,
        api_key: &ApiKey,
        stop: &GtfsId,
    ) -> Result<Arc<StopDetail>, LookupError> {
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(api_key, stop).await
        {
            return Ok(hit);
        }

        let data: StopsData = self
            .query(
                api_key,
                queries::STOP_DETAIL,
                json!({ "ids": [stop.as_str()] }),
            )
            .await?;

        let dto = data
            .stops
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| LookupError::StopNotFound(stop.clone()))?;

        let detail =
            Arc::new(convert_stop_detail(&dto).map_err(|e| LookupError::Malformed(e.to_string()))?);

        if let Some(cache) = &self.cache {
            cache.insert(api_key, detail.clone()).await;
        }

        Ok(detail)
    }

    /// Next `count` stop times at a stop. Never cached.
    pub async fn stop_departures(
        &self,
        api_key: &ApiKey,
        stop: &GtfsId,
        count: u32,
    ) -> Result<StopDepartures, LookupError> {
        let data: StopData = self
            .query(
                api_key,
                queries::STOP_DEPARTURES,
                json!({ "id": stop.as_str(), "count": count }),
            )
            .await?;

        let dto = data
            .stop
            .ok_or_else(|| LookupError::StopNotFound(stop.clone()))?;

        convert_departures(&dto).map_err(|e| LookupError::Malformed(e.to_string()))
    }

    async fn stops_by_name(&self, api_key: &ApiKey, name: &str) -> Result<Vec<Stop>, LookupError> {
        let data: StopsData = self
            .query(api_key, queries::STOPS_BY_NAME, json!({ "name": name }))
            .await?;
        Ok(convert_stops(&data.stops.unwrap_or_default()))
    }

    async fn stops_by_id(&self, api_key: &ApiKey, id: &GtfsId) -> Result<Vec<Stop>, LookupError> {
        let data: StopsData = self
            .query(api_key, queries::STOPS_BY_ID, json!({ "ids": [id.as_str()] }))
            .await?;
        Ok(convert_stops(&data.stops.unwrap_or_default()))
    }

    /// Execute a document and decode its `data` into `D`.
    async fn query<D: DeserializeOwned>(
        &self,
        api_key: &ApiKey,
        document: &str,
        variables: Value,
    ) -> Result<D, LookupError> {
        let headers = request_headers(api_key)?;
        let body = self.transport.execute(document, variables, headers).await?;

        let response: GraphqlResponse<D> =
            serde_json::from_value(body).map_err(|e| LookupError::Malformed(e.to_string()))?;

        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();

        match response.data {
            Some(data) => {
                if !messages.is_empty() {
                    debug!(errors = ?messages, "Partial GraphQL errors alongside data");
                }
                Ok(data)
            }
            None if !messages.is_empty() => Err(DigitransitError::Graphql(messages).into()),
            None => Err(LookupError::Malformed("response has no data".to_string())),
        }
    }
}

fn log_lookup_failure(error: &LookupError, query: &str) {
    match error {
        LookupError::Transport(e) => warn!(query, error = %e, "Digitransit lookup failed"),
        LookupError::Malformed(msg) => debug!(query, error = %msg, "Malformed lookup response"),
        LookupError::StopNotFound(id) => debug!(query, stop = %id, "Stop not found"),
    }
}
