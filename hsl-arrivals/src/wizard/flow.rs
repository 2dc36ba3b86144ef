//! The configuration wizard state machine.
//!
//! ```text
//! AwaitApiKey → AwaitStopQuery → AwaitStopChoice ─┐
//!                      │                          ▼
//!                      └── (GTFS id) ──────→ AwaitRouteChoice ─ (ALL) ─┐
//!                                                 │                    ▼
//!                                                 └→ AwaitDestinationChoice → Finalize
//! ```
//!
//! Each state carries everything resolved so far, so `Finalize` is only
//! reachable with a stop, route and destination in hand. Re-prompts leave
//! the state untouched.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::digitransit::GraphqlTransport;
use crate::directory::TransitDirectory;
use crate::domain::{ALL, ApiKey, DestinationFilter, GtfsId, RouteFilter, Stop, is_all};
use crate::entries::{ConfigEntry, EntryStore, StoreError};

use super::error::{AbortReason, FormError, StepId, WizardError};

/// A form to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub step: StepId,
    /// Allowed choices; empty for free-text steps.
    pub options: Vec<String>,
    pub error: Option<FormError>,
}

impl Form {
    fn new(step: StepId, options: Vec<String>) -> Self {
        Self {
            step,
            options,
            error: None,
        }
    }

    fn with_error(mut self, error: FormError) -> Self {
        self.error = Some(error);
        self
    }
}

/// What the wizard wants the host to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    /// Show a form and call the matching step method with the answer.
    Form(Form),
    /// End the session with this reason.
    Abort(AbortReason),
    /// The entry was committed to the store.
    CreateEntry(ConfigEntry),
}

#[derive(Debug, Clone)]
enum State {
    AwaitApiKey,
    AwaitStopQuery {
        api_key: ApiKey,
    },
    AwaitStopChoice {
        api_key: ApiKey,
        candidates: Vec<(String, Stop)>,
    },
    AwaitRouteChoice {
        api_key: ApiKey,
        stop: Stop,
        options: Vec<String>,
    },
    AwaitDestinationChoice {
        api_key: ApiKey,
        stop: Stop,
        route: String,
        options: Vec<String>,
    },
    Finished,
}

impl State {
    fn describe(&self) -> &'static str {
        match self {
            State::AwaitApiKey => "awaiting API key",
            State::AwaitStopQuery { .. } => "awaiting stop query",
            State::AwaitStopChoice { .. } => "awaiting stop choice",
            State::AwaitRouteChoice { .. } => "awaiting route choice",
            State::AwaitDestinationChoice { .. } => "awaiting destination choice",
            State::Finished => "finished",
        }
    }
}

/// One configuration session.
///
/// Sessions share the directory and the entry store, nothing else.
pub struct ResolutionWizard<T, S> {
    directory: Arc<TransitDirectory<T>>,
    store: Arc<S>,
    state: State,
}

impl<T: GraphqlTransport, S: EntryStore> ResolutionWizard<T, S> {
    /// Start a new session awaiting an API key.
    pub fn new(directory: Arc<TransitDirectory<T>>, store: Arc<S>) -> Self {
        Self {
            directory,
            store,
            state: State::AwaitApiKey,
        }
    }

    /// The step whose answer the wizard expects, or `None` once finished.
    pub fn current_step(&self) -> Option<StepId> {
        match self.state {
            State::AwaitApiKey => Some(StepId::ApiKey),
            State::AwaitStopQuery { .. } => Some(StepId::StopQuery),
            State::AwaitStopChoice { .. } => Some(StepId::PickStop),
            State::AwaitRouteChoice { .. } => Some(StepId::PickRoute),
            State::AwaitDestinationChoice { .. } => Some(StepId::PickDestination),
            State::Finished => None,
        }
    }

    /// The session's API key, once known.
    pub fn api_key(&self) -> Option<&ApiKey> {
        match &self.state {
            State::AwaitStopQuery { api_key }
            | State::AwaitStopChoice { api_key, .. }
            | State::AwaitRouteChoice { api_key, .. }
            | State::AwaitDestinationChoice { api_key, .. } => Some(api_key),
            State::AwaitApiKey | State::Finished => None,
        }
    }

    /// Open the session. A key the host already knows skips the key form.
    pub fn start(&mut self, known_key: Option<ApiKey>) -> Result<FlowStep, WizardError> {
        self.expect(StepId::ApiKey)?;

        Ok(match known_key {
            Some(api_key) => {
                self.state = State::AwaitStopQuery { api_key };
                FlowStep::Form(Form::new(StepId::StopQuery, Vec::new()))
            }
            None => FlowStep::Form(Form::new(StepId::ApiKey, Vec::new())),
        })
    }

    /// Answer the API key form.
    pub fn submit_api_key(&mut self, input: &str) -> Result<FlowStep, WizardError> {
        self.expect(StepId::ApiKey)?;

        match ApiKey::parse(input) {
            Ok(api_key) => {
                self.state = State::AwaitStopQuery { api_key };
                Ok(FlowStep::Form(Form::new(StepId::StopQuery, Vec::new())))
            }
            Err(_) => Ok(FlowStep::Form(
                Form::new(StepId::ApiKey, Vec::new()).with_error(FormError::MissingApiKey),
            )),
        }
    }

    /// Answer the stop query form with a stop name or GTFS id.
    pub async fn submit_stop_query(&mut self, input: &str) -> Result<FlowStep, WizardError> {
        let State::AwaitStopQuery { api_key } = &self.state else {
            return Err(self.out_of_order(StepId::StopQuery));
        };
        let api_key = api_key.clone();
        let query = input.trim();

        if let Ok(id) = GtfsId::parse(query) {
            let stop = self.display_stop(&api_key, id, query).await;
            return Ok(self.enter_route_step(api_key, stop).await);
        }

        let stops = self.directory.find_stops(&api_key, query).await;
        if stops.is_empty() {
            debug!(query, "No stops found for query");
            return Ok(FlowStep::Form(
                Form::new(StepId::StopQuery, Vec::new()).with_error(FormError::StopNotFound),
            ));
        }

        let candidates = label_candidates(stops);
        let options = candidates.iter().map(|(label, _)| label.clone()).collect();
        self.state = State::AwaitStopChoice {
            api_key,
            candidates,
        };
        Ok(FlowStep::Form(Form::new(StepId::PickStop, options)))
    }

    /// Choose one of the stop candidates by label.
    pub async fn choose_stop(&mut self, label: &str) -> Result<FlowStep, WizardError> {
        let State::AwaitStopChoice {
            api_key,
            candidates,
        } = &self.state
        else {
            return Err(self.out_of_order(StepId::PickStop));
        };

        let Some((_, stop)) = candidates.iter().find(|(l, _)| l == label) else {
            let options = candidates.iter().map(|(l, _)| l.clone()).collect();
            return Ok(FlowStep::Form(
                Form::new(StepId::PickStop, options).with_error(FormError::InvalidStopChoice),
            ));
        };

        let (api_key, stop) = (api_key.clone(), stop.clone());
        Ok(self.enter_route_step(api_key, stop).await)
    }

    /// Choose a route short name, or `ALL`.
    pub async fn choose_route(&mut self, label: &str) -> Result<FlowStep, WizardError> {
        let State::AwaitRouteChoice {
            api_key,
            stop,
            options,
        } = &self.state
        else {
            return Err(self.out_of_order(StepId::PickRoute));
        };

        if !options.iter().any(|o| o == label) {
            return Ok(FlowStep::Form(
                Form::new(StepId::PickRoute, options.clone())
                    .with_error(FormError::InvalidRouteChoice),
            ));
        }

        let (api_key, stop) = (api_key.clone(), stop.clone());

        if is_all(label) {
            return Ok(self
                .finalize(api_key, stop, RouteFilter::All, DestinationFilter::All)
                .await);
        }

        let mut options = self
            .directory
            .destinations_for_route(&api_key, &stop.gtfs_id, label)
            .await;
        if !options.iter().any(|o| o == ALL) {
            options.push(ALL.to_string());
        }

        self.state = State::AwaitDestinationChoice {
            api_key,
            stop,
            route: label.to_string(),
            options: options.clone(),
        };
        Ok(FlowStep::Form(Form::new(StepId::PickDestination, options)))
    }

    /// Choose a destination headsign, or `ALL`.
    pub async fn choose_destination(&mut self, label: &str) -> Result<FlowStep, WizardError> {
        let State::AwaitDestinationChoice {
            api_key,
            stop,
            route,
            options,
        } = &self.state
        else {
            return Err(self.out_of_order(StepId::PickDestination));
        };

        if !options.iter().any(|o| o == label) {
            return Ok(FlowStep::Form(
                Form::new(StepId::PickDestination, options.clone())
                    .with_error(FormError::InvalidDestinationChoice),
            ));
        }

        let (api_key, stop, route) = (api_key.clone(), stop.clone(), RouteFilter::parse(route));
        Ok(self
            .finalize(api_key, stop, route, DestinationFilter::parse(label))
            .await)
    }

    /// Resolve display fields for a GTFS id typed by the user.
    ///
    /// The id itself is trusted as typed; the lookup only supplies name
    /// and code, falling back to the raw query and an empty code.
    async fn display_stop(&self, api_key: &ApiKey, id: GtfsId, query: &str) -> Stop {
        match self.directory.find_stops(api_key, query).await.into_iter().next() {
            Some(found) => Stop {
                gtfs_id: id,
                name: found.name,
                code: found.code,
            },
            None => {
                debug!(stop = %id, "Stop lookup failed, using id as name");
                Stop::new(id, query, "")
            }
        }
    }

    async fn enter_route_step(&mut self, api_key: ApiKey, stop: Stop) -> FlowStep {
        let names: BTreeSet<String> = self
            .directory
            .routes_for_stop(&api_key, &stop.gtfs_id)
            .await
            .into_iter()
            .map(|r| r.short_name)
            .filter(|name| !is_all(name))
            .collect();

        if names.is_empty() {
            info!(stop = %stop.gtfs_id, "Stop has no routes, aborting");
            self.state = State::Finished;
            return FlowStep::Abort(AbortReason::NoRoutesForStop);
        }

        let mut options: Vec<String> = names.into_iter().collect();
        options.push(ALL.to_string());

        self.state = State::AwaitRouteChoice {
            api_key,
            stop,
            options: options.clone(),
        };
        FlowStep::Form(Form::new(StepId::PickRoute, options))
    }

    async fn finalize(
        &mut self,
        api_key: ApiKey,
        stop: Stop,
        route: RouteFilter,
        destination: DestinationFilter,
    ) -> FlowStep {
        let entry = ConfigEntry::new(&stop, route, destination, api_key);
        let id = entry.unique_id();
        self.state = State::Finished;

        if self.store.contains(&id).await {
            info!(unique_id = %id, "Subscription already configured");
            return FlowStep::Abort(AbortReason::DuplicateSubscription);
        }

        match self.store.insert(entry.clone()).await {
            Ok(()) => {
                info!(unique_id = %id, title = %entry.title, "Created subscription");
                FlowStep::CreateEntry(entry)
            }
            Err(StoreError::Duplicate(_)) => FlowStep::Abort(AbortReason::DuplicateSubscription),
            Err(e) => {
                warn!(unique_id = %id, error = %e, "Failed to save subscription");
                FlowStep::Abort(AbortReason::StoreFailed)
            }
        }
    }

    fn expect(&self, step: StepId) -> Result<(), WizardError> {
        if self.current_step() == Some(step) {
            Ok(())
        } else {
            Err(self.out_of_order(step))
        }
    }

    fn out_of_order(&self, attempted: StepId) -> WizardError {
        WizardError::OutOfOrder {
            attempted,
            current: self.state.describe(),
        }
    }
}

/// Pair stops with display labels, disambiguating repeated labels by id.
fn label_candidates(stops: Vec<Stop>) -> Vec<(String, Stop)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for stop in &stops {
        *counts.entry(stop.label()).or_default() += 1;
    }

    stops
        .into_iter()
        .map(|stop| {
            let label = stop.label();
            let label = if counts.get(&label).copied().unwrap_or(0) > 1 {
                format!("{label} [{}]", stop.gtfs_id)
            } else {
                label
            };
            (label, stop)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digitransit::{MockTransport, queries};
    use crate::entries::MemoryEntryStore;
    use serde_json::{Value, json};

    type Wizard = ResolutionWizard<MockTransport, MemoryEntryStore>;

    fn key() -> ApiKey {
        ApiKey::parse("test-key").unwrap()
    }

    fn stop_with_routes(id: &str, name: &str, code: &str, routes: Value) -> Value {
        json!({ "gtfsId": id, "name": name, "code": code, "routes": routes })
    }

    fn kuusisaarentie() -> Value {
        stop_with_routes(
            "HSL:1303298",
            "Kuusisaarentie",
            "H1415",
            json!([
                {"shortName": "550", "patterns": [{"headsign": "Itäkeskus"}, {"headsign": "Westendinasema"}]},
                {"shortName": "194", "patterns": [{"headsign": "Kamppi"}]},
                {"shortName": "18", "patterns": [{"headsign": "Eira"}]}
            ]),
        )
    }

    fn wizard(mock: MockTransport) -> (Wizard, Arc<MemoryEntryStore>) {
        let store = Arc::new(MemoryEntryStore::new());
        let dir = Arc::new(TransitDirectory::new(mock));
        (ResolutionWizard::new(dir, store.clone()), store)
    }

    fn form(step: FlowStep) -> Form {
        match step {
            FlowStep::Form(f) => f,
            other => panic!("expected form, got {:?}", other),
        }
    }

    #[test]
    fn blank_api_key_reprompts() {
        let (mut w, _) = wizard(MockTransport::new());
        assert_eq!(form(w.start(None).unwrap()).step, StepId::ApiKey);

        let f = form(w.submit_api_key("   ").unwrap());
        assert_eq!(f.step, StepId::ApiKey);
        assert_eq!(f.error, Some(FormError::MissingApiKey));
        assert_eq!(w.current_step(), Some(StepId::ApiKey));

        let f = form(w.submit_api_key(" abc ").unwrap());
        assert_eq!(f.step, StepId::StopQuery);
        assert_eq!(w.api_key().map(ApiKey::expose), Some("abc"));
    }

    #[test]
    fn known_key_skips_key_form() {
        let (mut w, _) = wizard(MockTransport::new());
        let f = form(w.start(Some(key())).unwrap());
        assert_eq!(f.step, StepId::StopQuery);
    }

    #[tokio::test]
    async fn gtfs_id_goes_straight_to_routes() {
        let (mut w, _) = wizard(MockTransport::new().with_stop(kuusisaarentie()));
        w.start(Some(key())).unwrap();

        let f = form(w.submit_stop_query("HSL:1303298").await.unwrap());
        assert_eq!(f.step, StepId::PickRoute);
        assert_eq!(f.options, vec!["18", "194", "550", "ALL"]);
    }

    #[tokio::test]
    async fn gtfs_id_with_failed_lookup_uses_raw_query() {
        let mock = MockTransport::new()
            .with_failure(queries::STOPS_BY_ID, "HSL:42")
            .with_raw(
                queries::STOP_DETAIL,
                "HSL:42",
                json!({"data": {"stops": [stop_with_routes(
                    "HSL:42", "Somewhere", "H42",
                    json!([{"shortName": "1", "patterns": []}])
                )]}}),
            );
        let (mut w, store) = wizard(mock);
        w.start(Some(key())).unwrap();

        form(w.submit_stop_query("HSL:42").await.unwrap());
        let step = w.choose_route("ALL").await.unwrap();

        let FlowStep::CreateEntry(entry) = step else {
            panic!("expected entry, got {:?}", step);
        };
        assert_eq!(entry.stop_name, "HSL:42");
        assert_eq!(entry.stop_code, "");
        assert_eq!(entry.title, "HSL:42 – ALL");
        assert_eq!(store.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_name_reprompts_with_no_stops_found() {
        let (mut w, _) = wizard(MockTransport::new());
        w.start(Some(key())).unwrap();

        let f = form(w.submit_stop_query("Nowhere").await.unwrap());
        assert_eq!(f.step, StepId::StopQuery);
        assert_eq!(f.error, Some(FormError::StopNotFound));
        assert_eq!(f.error.map(|e| e.code()), Some("no_stops_found"));
        assert_eq!(w.current_step(), Some(StepId::StopQuery));
    }

    #[tokio::test]
    async fn invalid_choices_reprompt_without_state_change() {
        let (mut w, _) = wizard(MockTransport::new().with_stop(kuusisaarentie()));
        w.start(Some(key())).unwrap();
        w.submit_stop_query("HSL:1303298").await.unwrap();

        let f = form(w.choose_route("999").await.unwrap());
        assert_eq!(f.error, Some(FormError::InvalidRouteChoice));
        assert_eq!(f.options, vec!["18", "194", "550", "ALL"]);
        assert_eq!(w.current_step(), Some(StepId::PickRoute));

        let f = form(w.choose_route("550").await.unwrap());
        assert_eq!(f.step, StepId::PickDestination);
        assert_eq!(f.options, vec!["Itäkeskus", "Westendinasema", "ALL"]);

        let f = form(w.choose_destination("Espoo").await.unwrap());
        assert_eq!(f.error, Some(FormError::InvalidDestinationChoice));
        assert_eq!(w.current_step(), Some(StepId::PickDestination));
    }

    #[tokio::test]
    async fn route_without_headsigns_offers_all_once() {
        let stop = stop_with_routes(
            "HSL:1",
            "A",
            "H1",
            json!([{"shortName": "7", "patterns": [{"headsign": null}]}]),
        );
        let (mut w, _) = wizard(MockTransport::new().with_stop(stop));
        w.start(Some(key())).unwrap();
        w.submit_stop_query("HSL:1").await.unwrap();

        let f = form(w.choose_route("7").await.unwrap());
        assert_eq!(f.options, vec!["ALL"]);
    }

    #[tokio::test]
    async fn full_flow_creates_entry() {
        let (mut w, store) = wizard(MockTransport::new().with_stop(kuusisaarentie()));
        w.start(Some(key())).unwrap();
        w.submit_stop_query("HSL:1303298").await.unwrap();
        w.choose_route("550").await.unwrap();

        let step = w.choose_destination("Itäkeskus").await.unwrap();
        let FlowStep::CreateEntry(entry) = step else {
            panic!("expected entry, got {:?}", step);
        };

        assert_eq!(entry.title, "Kuusisaarentie (H1415) – 550 → Itäkeskus");
        assert_eq!(entry.route, RouteFilter::parse("550"));
        assert_eq!(entry.destination, DestinationFilter::parse("Itäkeskus"));
        assert_eq!(entry.api_key, key());
        assert!(store.contains(&entry.unique_id()).await);
        assert_eq!(w.current_step(), None);
    }

    #[tokio::test]
    async fn duplicate_subscription_aborts() {
        let mock = MockTransport::new().with_stop(kuusisaarentie());
        let store = Arc::new(MemoryEntryStore::new());
        let dir = Arc::new(TransitDirectory::new(mock));

        for expected in [None, Some(AbortReason::DuplicateSubscription)] {
            let mut w = ResolutionWizard::new(dir.clone(), store.clone());
            w.start(Some(key())).unwrap();
            w.submit_stop_query("HSL:1303298").await.unwrap();
            w.choose_route("550").await.unwrap();
            let step = w.choose_destination("ALL").await.unwrap();

            match (expected, step) {
                (None, FlowStep::CreateEntry(e)) => {
                    assert_eq!(e.title, "Kuusisaarentie (H1415) – 550 (ALL)")
                }
                (Some(reason), FlowStep::Abort(got)) => {
                    assert_eq!(got, reason);
                    assert_eq!(got.code(), "already_configured");
                }
                (_, other) => panic!("unexpected step {:?}", other),
            }
        }
        assert_eq!(store.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn out_of_order_calls_are_rejected() {
        let (mut w, _) = wizard(MockTransport::new());

        assert!(matches!(
            w.choose_route("550").await,
            Err(WizardError::OutOfOrder {
                attempted: StepId::PickRoute,
                ..
            })
        ));
        assert!(w.submit_stop_query("Kamppi").await.is_err());
        assert_eq!(w.current_step(), Some(StepId::ApiKey));

        w.start(Some(key())).unwrap();
        assert!(w.start(Some(key())).is_err());
        assert!(w.submit_api_key("other").is_err());
    }

    #[test]
    fn duplicate_labels_disambiguated() {
        let stops = vec![
            Stop::new(GtfsId::parse("HSL:1").unwrap(), "Kamppi", "H0082"),
            Stop::new(GtfsId::parse("HSL:2").unwrap(), "Kamppi", "H0082"),
            Stop::new(GtfsId::parse("HSL:3").unwrap(), "Kamppi", "H0083"),
        ];
        let labels: Vec<String> = label_candidates(stops).into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec![
                "Kamppi (H0082) [HSL:1]",
                "Kamppi (H0082) [HSL:2]",
                "Kamppi (H0083)"
            ]
        );
    }
}
