//! JSON API over the configured sensors.
//!
//! Serves the current sensor values for a host that polls over HTTP.

mod dto;
mod routes;
mod state;

pub use dto::{ErrorResponse, SensorsResponse};
pub use routes::create_router;
pub use state::AppState;
