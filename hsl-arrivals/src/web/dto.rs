//! Response bodies for the JSON API.

use serde::Serialize;

use crate::sensor::SensorSnapshot;

/// Response for `GET /sensors`.
#[derive(Debug, Serialize)]
pub struct SensorsResponse {
    pub sensors: Vec<SensorSnapshot>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
