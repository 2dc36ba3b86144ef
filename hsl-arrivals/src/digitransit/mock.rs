//! Mock GraphQL transport for testing without API access.
//!
//! Serves canned JSON bodies keyed by query document and variables, and
//! records every call so tests can assert on what was asked.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::client::GraphqlTransport;
use super::error::DigitransitError;
use super::queries::{STOP_DEPARTURES, STOP_DETAIL, STOPS_BY_ID, STOPS_BY_NAME};

/// One recorded `execute` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub query: &'static str,
    pub variables: Value,
    /// Value of the `digitransit-subscription-key` header, if sent.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
enum Reply {
    Body(Value),
    Unavailable,
}

/// Mock transport that serves pre-registered responses.
///
/// Unregistered requests get an empty result set (`{"data": {"stops": []}}`
/// or `{"data": {"stop": null}}`), mirroring how the real API answers
/// unknown names and ids.
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: HashMap<(&'static str, String), Reply>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    offline: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer a name search for exactly `name` with these stops.
    pub fn with_stops_by_name(mut self, name: &str, stops: Value) -> Self {
        self.replies.insert(
            (STOPS_BY_NAME, name.to_string()),
            Reply::Body(json!({ "data": { "stops": stops } })),
        );
        self
    }

    /// Answer id lookups (summary and detail) for `stop["gtfsId"]`.
    pub fn with_stop(mut self, stop: Value) -> Self {
        let id = stop["gtfsId"].as_str().unwrap_or_default().to_string();
        let body = Reply::Body(json!({ "data": { "stops": [stop] } }));
        self.replies
            .insert((STOPS_BY_ID, id.clone()), body.clone());
        self.replies.insert((STOP_DETAIL, id), body);
        self
    }

    /// Answer the departures query for `stop["gtfsId"]`.
    pub fn with_departures(mut self, stop: Value) -> Self {
        let id = stop["gtfsId"].as_str().unwrap_or_default().to_string();
        self.replies.insert(
            (STOP_DEPARTURES, id),
            Reply::Body(json!({ "data": { "stop": stop } })),
        );
        self
    }

    /// Answer a query/key pair with a raw body.
    pub fn with_raw(mut self, query: &'static str, key: &str, body: Value) -> Self {
        self.replies
            .insert((query, key.to_string()), Reply::Body(body));
        self
    }

    /// Fail the given query/key pair with a 503.
    pub fn with_failure(mut self, query: &'static str, key: &str) -> Self {
        self.replies
            .insert((query, key.to_string()), Reply::Unavailable);
        self
    }

    /// Make every call fail (or succeed again) from now on.
    pub async fn set_offline(&self, offline: bool) {
        *self.offline.lock().await = offline;
    }

    /// All calls made so far.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Calls made so far for one query document.
    pub async fn calls_for(&self, query: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.query == query)
            .cloned()
            .collect()
    }
}

/// Map a query string to its canonical document and the lookup key in its
/// variables.
fn classify(query: &str, variables: &Value) -> Option<(&'static str, String)> {
    let first_id = || {
        variables["ids"][0]
            .as_str()
            .unwrap_or_default()
            .to_string()
    };

    [STOPS_BY_NAME, STOPS_BY_ID, STOP_DETAIL, STOP_DEPARTURES]
        .into_iter()
        .find(|doc| *doc == query)
        .map(|doc| {
            let key = match doc {
                STOPS_BY_NAME => variables["name"].as_str().unwrap_or_default().to_string(),
                STOP_DEPARTURES => variables["id"].as_str().unwrap_or_default().to_string(),
                _ => first_id(),
            };
            (doc, key)
        })
}

impl GraphqlTransport for MockTransport {
    async fn execute(
        &self,
        query: &str,
        variables: Value,
        headers: HeaderMap,
    ) -> Result<Value, DigitransitError> {
        let (doc, key) = classify(query, &variables).ok_or_else(|| DigitransitError::ApiError {
            status: 400,
            message: "unknown query document".to_string(),
        })?;

        self.calls.lock().await.push(RecordedCall {
            query: doc,
            variables,
            api_key: headers
                .get("digitransit-subscription-key")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        });

        if *self.offline.lock().await {
            return Err(DigitransitError::ApiError {
                status: 503,
                message: "mock transport offline".to_string(),
            });
        }

        match self.replies.get(&(doc, key)) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Unavailable) => Err(DigitransitError::ApiError {
                status: 503,
                message: "Service Unavailable".to_string(),
            }),
            None if doc == STOP_DEPARTURES => Ok(json!({ "data": { "stop": null } })),
            None => Ok(json!({ "data": { "stops": [] } })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_registered_stops_and_records_calls() {
        let mock = MockTransport::new().with_stops_by_name(
            "Kamppi",
            json!([{ "gtfsId": "HSL:1040601", "name": "Kamppi", "code": "H0082" }]),
        );

        let body = mock
            .execute(STOPS_BY_NAME, json!({ "name": "Kamppi" }), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(body["data"]["stops"][0]["code"], "H0082");

        let calls = mock.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, STOPS_BY_NAME);
        assert!(calls[0].api_key.is_none());
    }

    #[tokio::test]
    async fn unknown_requests_get_empty_results() {
        let mock = MockTransport::new();

        let body = mock
            .execute(STOPS_BY_NAME, json!({ "name": "nowhere" }), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(body["data"]["stops"], json!([]));

        let body = mock
            .execute(
                STOP_DEPARTURES,
                json!({ "id": "HSL:9", "count": 5 }),
                HeaderMap::new(),
            )
            .await
            .unwrap();
        assert!(body["data"]["stop"].is_null());
    }

    #[tokio::test]
    async fn offline_fails_every_call() {
        let mock = MockTransport::new();
        mock.set_offline(true).await;

        let result = mock
            .execute(STOPS_BY_NAME, json!({ "name": "x" }), HeaderMap::new())
            .await;
        assert!(result.is_err());
        assert_eq!(mock.calls().await.len(), 1);
    }
}
