//! Application state for the web layer.

use std::sync::Arc;

use crate::sensor::RouteSensor;

/// Shared application state: the sensors being served.
pub struct AppState<T> {
    pub sensors: Arc<Vec<Arc<RouteSensor<T>>>>,
}

impl<T> AppState<T> {
    pub fn new(sensors: Vec<Arc<RouteSensor<T>>>) -> Self {
        Self {
            sensors: Arc::new(sensors),
        }
    }
}

// Manual impl: cloning the state never needs `T: Clone`.
impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            sensors: Arc::clone(&self.sensors),
        }
    }
}
