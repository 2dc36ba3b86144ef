//! HSL arrivals.
//!
//! Subscribe to upcoming arrivals at a Helsinki-region transit stop: pick a
//! stop, route and destination interactively, then poll the Digitransit
//! routing API and expose the next arrivals as a sensor.

pub mod cache;
pub mod coordinator;
pub mod digitransit;
pub mod directory;
pub mod domain;
pub mod entries;
pub mod sensor;
pub mod web;
pub mod wizard;
