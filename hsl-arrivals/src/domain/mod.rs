//! Domain types for HSL arrivals.
//!
//! Identifiers are validated at construction time, so code that receives
//! a `GtfsId` or `ApiKey` can trust it.

mod api_key;
mod arrival;
mod error;
mod gtfs_id;
mod selection;
mod stop;

pub use api_key::ApiKey;
pub use arrival::{ArrivalEntry, RouteData};
pub use error::DomainError;
pub use gtfs_id::GtfsId;
pub use selection::{ALL, DestinationFilter, RouteFilter, Selection, UniqueId, is_all};
pub use stop::{Pattern, Route, Stop, StopDetail, stop_label};
