//! Periodic arrival refresh for one subscription.
//!
//! Each `ArrivalCoordinator` owns the latest `RouteData` snapshot for a
//! single config entry. A refresh builds a complete new snapshot and swaps
//! it in, so readers see either the old or the new value. Transport
//! failures leave the previous snapshot in place.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::digitransit::{GraphqlTransport, StopDepartures};
use crate::directory::{LookupError, TransitDirectory};
use crate::domain::{RouteData, Selection};
use crate::entries::ConfigEntry;

/// Shortest time between polls.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for arrival refreshes.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Time between polls; `spawn_polling` never goes below `MIN_UPDATE_INTERVAL`
    pub update_interval: Duration,
    /// Stop times requested per refresh, before route/destination filtering
    pub departures: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(30),
            departures: 20,
        }
    }
}

impl CoordinatorConfig {
    /// Set the time between polls, clamped to at least `MIN_UPDATE_INTERVAL`.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval.max(MIN_UPDATE_INTERVAL);
        self
    }

    pub fn with_departures(mut self, count: u32) -> Self {
        self.departures = count;
        self
    }
}

/// Health of the most recent refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub last_attempt: Option<DateTime<Utc>>,
}

/// What a call to `refresh` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was stored.
    Updated { arrivals: usize },
    /// Another refresh was already running; nothing was queried.
    Skipped,
    /// The request failed; the previous snapshot was kept.
    Failed,
}

/// The snapshot and the status of the refresh that produced it.
///
/// Both are swapped under one lock so readers never pair new data with an
/// old status.
#[derive(Debug, Clone, Default)]
pub struct Published {
    pub data: Option<Arc<RouteData>>,
    pub status: UpdateStatus,
}

/// Keeps the arrivals of one subscription up to date.
pub struct ArrivalCoordinator<T> {
    directory: Arc<TransitDirectory<T>>,
    entry: ConfigEntry,
    selection: Selection,
    config: CoordinatorConfig,
    published: RwLock<Published>,
    refreshing: Mutex<()>,
}

impl<T: GraphqlTransport> ArrivalCoordinator<T> {
    pub fn new(
        directory: Arc<TransitDirectory<T>>,
        entry: ConfigEntry,
        config: CoordinatorConfig,
    ) -> Self {
        let selection = entry.selection();
        Self {
            directory,
            entry,
            selection,
            config,
            published: RwLock::new(Published::default()),
            refreshing: Mutex::new(()),
        }
    }

    pub fn entry(&self) -> &ConfigEntry {
        &self.entry
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The latest snapshot, or `None` before the first successful refresh.
    pub async fn route_data(&self) -> Option<Arc<RouteData>> {
        self.published.read().await.data.clone()
    }

    pub async fn status(&self) -> UpdateStatus {
        self.published.read().await.status.clone()
    }

    /// Snapshot and status as one consistent pair.
    pub async fn published(&self) -> Published {
        self.published.read().await.clone()
    }

    /// Fetch arrivals and replace the snapshot.
    ///
    /// Never fails: transport errors are recorded in `UpdateStatus` and the
    /// previous snapshot is kept. A malformed response or an unknown stop
    /// replaces the snapshot with one that has no arrivals.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(_guard) = self.refreshing.try_lock() else {
            debug!(unique_id = %self.selection.unique_id(), "Refresh already in flight");
            return RefreshOutcome::Skipped;
        };

        let now = Utc::now();
        let result = self
            .directory
            .stop_departures(
                &self.entry.api_key,
                self.selection.stop(),
                self.config.departures,
            )
            .await;

        let snapshot = match result {
            Ok(departures) => self.build_snapshot(departures, now),
            Err(e) if e.is_transport() => {
                self.record_failure(&e, now).await;
                return RefreshOutcome::Failed;
            }
            Err(e) => {
                warn!(
                    unique_id = %self.selection.unique_id(),
                    error = %e,
                    "Unusable arrivals response, clearing arrivals"
                );
                self.empty_snapshot(now)
            }
        };

        let count = snapshot.arrivals().len();
        debug!(unique_id = %self.selection.unique_id(), arrivals = count, "Refreshed arrivals");

        *self.published.write().await = Published {
            data: Some(Arc::new(snapshot)),
            status: UpdateStatus {
                last_update_success: true,
                last_error: None,
                consecutive_failures: 0,
                last_attempt: Some(now),
            },
        };

        RefreshOutcome::Updated { arrivals: count }
    }

    fn build_snapshot(&self, departures: StopDepartures, now: DateTime<Utc>) -> RouteData {
        let route = self.selection.route();
        let destination = self.selection.destination();

        let arrivals = departures
            .arrivals
            .into_iter()
            .filter(|a| route.matches(&a.route))
            .filter(|a| destination.matches(a.destination.as_deref()))
            .collect();

        RouteData::new(
            departures.stop.name,
            departures.stop.code,
            departures.stop.gtfs_id,
            arrivals,
            now,
        )
    }

    fn empty_snapshot(&self, now: DateTime<Utc>) -> RouteData {
        RouteData::new(
            self.entry.stop_name.clone(),
            self.entry.stop_code.clone(),
            self.entry.stop_gtfs_id.clone(),
            Vec::new(),
            now,
        )
    }

    async fn record_failure(&self, error: &LookupError, now: DateTime<Utc>) {
        let mut published = self.published.write().await;
        let status = &mut published.status;
        status.last_update_success = false;
        status.last_error = Some(error.to_string());
        status.consecutive_failures += 1;
        status.last_attempt = Some(now);

        warn!(
            unique_id = %self.selection.unique_id(),
            failures = status.consecutive_failures,
            error = %error,
            "Failed to refresh arrivals, keeping previous data"
        );
    }
}

/// Refresh a coordinator every `update_interval` until the task is aborted.
///
/// The first refresh happens one interval after spawning; callers do the
/// initial refresh themselves. Ticks missed while a refresh overran are
/// skipped rather than bunched up.
pub fn spawn_polling<T>(coordinator: Arc<ArrivalCoordinator<T>>) -> JoinHandle<()>
where
    T: GraphqlTransport + 'static,
{
    let interval = coordinator
        .config()
        .update_interval
        .max(MIN_UPDATE_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // First tick is immediate
        loop {
            ticker.tick().await;
            coordinator.refresh().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digitransit::{MockTransport, queries};
    use crate::domain::{ApiKey, DestinationFilter, GtfsId, RouteFilter, Stop};
    use serde_json::{Value, json};

    const SERVICE_DAY: i64 = 1_700_000_000;

    fn stoptime(route: &str, headsign: Option<&str>, sched: i64, rt: i64, realtime: bool) -> Value {
        json!({
            "serviceDay": SERVICE_DAY,
            "scheduledArrival": sched,
            "realtimeArrival": rt,
            "realtime": realtime,
            "headsign": headsign,
            "trip": { "tripHeadsign": null, "route": { "shortName": route } }
        })
    }

    fn departures() -> Value {
        json!({
            "gtfsId": "HSL:1303298",
            "name": "Kuusisaarentie",
            "code": "H1415",
            "stoptimesWithoutPatterns": [
                stoptime("550", Some("Westendinasema"), 600, 600, false),
                stoptime("18", Some("Eira"), 120, 180, true),
                stoptime("550", Some("Helsinki Itäkeskus"), 300, 360, true),
                stoptime("550", None, 900, 900, false),
                stoptime("550", Some("Helsinki Itäkeskus"), 1500, 1500, false)
            ]
        })
    }

    fn entry(route: &str, dest: &str) -> ConfigEntry {
        ConfigEntry::new(
            &Stop::new(GtfsId::parse("HSL:1303298").unwrap(), "Kuusisaarentie", "H1415"),
            RouteFilter::parse(route),
            DestinationFilter::parse(dest),
            ApiKey::parse("k").unwrap(),
        )
    }

    fn coordinator(mock: MockTransport, entry: ConfigEntry) -> ArrivalCoordinator<MockTransport> {
        ArrivalCoordinator::new(
            Arc::new(TransitDirectory::new(mock)),
            entry,
            CoordinatorConfig::default(),
        )
    }

    #[test]
    fn default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.update_interval, Duration::from_secs(30));
        assert_eq!(config.departures, 20);

        let config = config.with_departures(5);
        assert_eq!(config.departures, 5);

        let config = config.with_update_interval(Duration::ZERO);
        assert_eq!(config.update_interval, MIN_UPDATE_INTERVAL);
    }

    #[tokio::test]
    async fn all_routes_sorted_by_arrival() {
        let coord = coordinator(MockTransport::new().with_departures(departures()), entry("ALL", "ALL"));

        assert_eq!(coord.refresh().await, RefreshOutcome::Updated { arrivals: 5 });

        let data = coord.route_data().await.unwrap();
        let times: Vec<i64> = data.arrivals().iter().map(|a| a.arrival.timestamp()).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);

        let primary = data.primary().unwrap();
        assert_eq!(primary.route, "18");
        assert_eq!(primary.arrival.timestamp(), SERVICE_DAY + 180);
        assert!(primary.realtime);
        assert_eq!(data.stop_code, "H1415");
    }

    #[tokio::test]
    async fn destination_substring_match_keeps_full_headsign() {
        let coord = coordinator(
            MockTransport::new().with_departures(departures()),
            entry("550", "Itäkeskus"),
        );

        coord.refresh().await;
        let data = coord.route_data().await.unwrap();

        assert_eq!(data.arrivals().len(), 2);
        for arrival in data.arrivals() {
            assert_eq!(arrival.route, "550");
            assert_eq!(arrival.destination.as_deref(), Some("Helsinki Itäkeskus"));
        }
        assert_eq!(data.primary().unwrap().arrival.timestamp(), SERVICE_DAY + 360);
    }

    #[tokio::test]
    async fn route_filter_is_case_insensitive_and_passes_missing_headsign_only_for_all() {
        let mut body = departures();
        body["stoptimesWithoutPatterns"] = json!([
            stoptime("550B", None, 60, 60, false),
            stoptime("550B", Some("Espoo"), 120, 120, false)
        ]);

        let coord = coordinator(MockTransport::new().with_departures(body), entry("550b", "ALL"));
        assert_eq!(coord.refresh().await, RefreshOutcome::Updated { arrivals: 2 });
    }

    #[tokio::test]
    async fn transport_failure_keeps_previous_snapshot() {
        let mock = MockTransport::new().with_departures(departures());
        let coord = coordinator(mock.clone(), entry("ALL", "ALL"));

        coord.refresh().await;
        let before = coord.route_data().await.unwrap();

        mock.set_offline(true).await;
        assert_eq!(coord.refresh().await, RefreshOutcome::Failed);
        assert_eq!(coord.refresh().await, RefreshOutcome::Failed);

        let after = coord.route_data().await.unwrap();
        assert_eq!(*after, *before);

        let status = coord.status().await;
        assert!(!status.last_update_success);
        assert_eq!(status.consecutive_failures, 2);
        assert!(status.last_error.is_some());

        mock.set_offline(false).await;
        coord.refresh().await;
        let status = coord.status().await;
        assert!(status.last_update_success);
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn first_refresh_failure_leaves_no_data() {
        let mock = MockTransport::new().with_failure(queries::STOP_DEPARTURES, "HSL:1303298");
        let coord = coordinator(mock, entry("ALL", "ALL"));

        assert_eq!(coord.refresh().await, RefreshOutcome::Failed);
        assert!(coord.route_data().await.is_none());
    }

    #[tokio::test]
    async fn missing_stop_clears_arrivals() {
        let gone = coordinator(MockTransport::new(), entry("ALL", "ALL"));
        assert_eq!(gone.refresh().await, RefreshOutcome::Updated { arrivals: 0 });

        let data = gone.route_data().await.unwrap();
        assert!(data.is_empty());
        assert_eq!(data.stop_name, "Kuusisaarentie");
        assert!(gone.status().await.last_update_success);
    }

    #[tokio::test]
    async fn malformed_response_clears_arrivals() {
        let mock = MockTransport::new().with_raw(
            queries::STOP_DEPARTURES,
            "HSL:1303298",
            json!({ "data": { "stop": { "gtfsId": "HSL:1303298" } } }),
        );
        let coord = coordinator(mock, entry("ALL", "ALL"));

        assert_eq!(coord.refresh().await, RefreshOutcome::Updated { arrivals: 0 });
    }

    #[tokio::test]
    async fn concurrent_refresh_is_skipped() {
        let coord = coordinator(MockTransport::new().with_departures(departures()), entry("ALL", "ALL"));

        let held = coord.refreshing.lock().await;
        assert_eq!(coord.refresh().await, RefreshOutcome::Skipped);
        drop(held);

        assert!(coord.directory.transport().calls().await.is_empty());
        assert!(matches!(coord.refresh().await, RefreshOutcome::Updated { .. }));
    }

    #[tokio::test]
    async fn requests_configured_departure_count() {
        let coord = ArrivalCoordinator::new(
            Arc::new(TransitDirectory::new(MockTransport::new().with_departures(departures()))),
            entry("ALL", "ALL"),
            CoordinatorConfig::default().with_departures(7),
        );
        coord.refresh().await;

        let calls = coord.directory.transport().calls().await;
        assert_eq!(calls[0].variables["count"], 7);
        assert_eq!(calls[0].api_key.as_deref(), Some("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_refreshes_on_interval() {
        let coord = Arc::new(ArrivalCoordinator::new(
            Arc::new(TransitDirectory::new(MockTransport::new().with_departures(departures()))),
            entry("ALL", "ALL"),
            CoordinatorConfig::default().with_update_interval(Duration::from_secs(30)),
        ));

        let handle = spawn_polling(coord.clone());
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(!handle.is_finished());
        handle.abort();

        let calls = coord.directory.transport().calls().await.len();
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_polls_at_minimum_rate() {
        let mut config = CoordinatorConfig::default();
        config.update_interval = Duration::ZERO;

        let coord = Arc::new(ArrivalCoordinator::new(
            Arc::new(TransitDirectory::new(MockTransport::new().with_departures(departures()))),
            entry("ALL", "ALL"),
            config,
        ));

        let handle = spawn_polling(coord.clone());
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!handle.is_finished());
        handle.abort();

        let calls = coord.directory.transport().calls().await.len();
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn published_pairs_data_with_its_status() {
        let mock = MockTransport::new().with_departures(departures());
        let coord = coordinator(mock.clone(), entry("ALL", "ALL"));

        coord.refresh().await;
        let published = coord.published().await;
        let data = published.data.unwrap();
        assert!(published.status.last_update_success);
        assert_eq!(published.status.last_attempt, Some(data.fetched_at));

        mock.set_offline(true).await;
        coord.refresh().await;
        let published = coord.published().await;
        assert_eq!(published.data.unwrap().fetched_at, data.fetched_at);
        assert!(!published.status.last_update_success);
        assert_eq!(published.status.consecutive_failures, 1);
    }
}
