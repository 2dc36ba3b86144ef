//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::future::join_all;
use tracing::debug;

use crate::digitransit::GraphqlTransport;
use crate::sensor::SensorSnapshot;

use super::dto::{ErrorResponse, SensorsResponse};
use super::state::AppState;

/// Create the application router.
///
/// Unique ids contain `/`, so the sensor route captures the rest of the path.
pub fn create_router<T>(state: AppState<T>) -> Router
where
    T: GraphqlTransport + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/sensors", get(list_sensors::<T>))
        .route("/sensors/*unique_id", get(get_sensor::<T>))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// All sensors, in entry order.
async fn list_sensors<T: GraphqlTransport + 'static>(
    State(state): State<AppState<T>>,
) -> Json<SensorsResponse> {
    let sensors = join_all(state.sensors.iter().map(|s| s.snapshot())).await;
    Json(SensorsResponse { sensors })
}

/// One sensor by unique id.
async fn get_sensor<T: GraphqlTransport + 'static>(
    State(state): State<AppState<T>>,
    Path(unique_id): Path<String>,
) -> Result<Json<SensorSnapshot>, AppError> {
    let unique_id = unique_id.trim_start_matches('/');

    let sensor = state
        .sensors
        .iter()
        .find(|s| s.unique_id().as_str() == unique_id)
        .ok_or_else(|| AppError::NotFound {
            message: format!("no sensor with unique id {unique_id}"),
        })?;

    Ok(Json(sensor.snapshot().await))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        debug!(%status, error = %message, "Request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
