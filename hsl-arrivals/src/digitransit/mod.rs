//! Digitransit routing API client.
//!
//! The HSL network is served by the Digitransit GraphQL routing API.
//! Key characteristics:
//! - Stops are identified by GTFS ids of the form `HSL:1303298`
//! - Name search is case-sensitive on the server side
//! - Arrival times are seconds since the start of the service day, which
//!   is itself given as a Unix timestamp
//! - Every request needs a subscription key header

mod client;
mod convert;
mod error;
mod mock;
pub mod queries;
mod types;

pub use client::{
    DEFAULT_BASE_URL, DigitransitClient, DigitransitConfig, GraphqlTransport, request_headers,
};
pub use convert::{ConversionError, StopDepartures};
pub use error::DigitransitError;
pub use mock::{MockTransport, RecordedCall};
pub use types::{GraphqlResponse, StopData, StopsData};

pub(crate) use convert::{convert_departures, convert_stop_detail, convert_stops};
