//! Wizard outcomes that aren't a normal step forward.

use std::fmt;

use serde::Serialize;

/// Identifies a wizard step (and the form shown for it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepId {
    #[serde(rename = "apikey")]
    ApiKey,
    #[serde(rename = "user")]
    StopQuery,
    #[serde(rename = "pick_stop")]
    PickStop,
    #[serde(rename = "pick_route")]
    PickRoute,
    #[serde(rename = "pick_dest")]
    PickDestination,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::ApiKey => "apikey",
            StepId::StopQuery => "user",
            StepId::PickStop => "pick_stop",
            StepId::PickRoute => "pick_route",
            StepId::PickDestination => "pick_dest",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-correctable problem; the same step is shown again with this error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("no stops match the query")]
    StopNotFound,

    #[error("not one of the offered stops")]
    InvalidStopChoice,

    #[error("not one of the offered routes")]
    InvalidRouteChoice,

    #[error("not one of the offered destinations")]
    InvalidDestinationChoice,
}

impl FormError {
    /// Translation key shown by the host.
    pub fn code(&self) -> &'static str {
        match self {
            FormError::MissingApiKey => "missing_apikey",
            FormError::StopNotFound => "no_stops_found",
            FormError::InvalidStopChoice => "invalid_stop",
            FormError::InvalidRouteChoice => "invalid_route",
            FormError::InvalidDestinationChoice => "invalid_destination",
        }
    }
}

/// Terminal problem; the whole session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AbortReason {
    #[error("the chosen stop has no routes")]
    NoRoutesForStop,

    #[error("this stop, route and destination are already configured")]
    DuplicateSubscription,

    #[error("the entry could not be saved")]
    StoreFailed,
}

impl AbortReason {
    /// Translation key shown by the host.
    pub fn code(&self) -> &'static str {
        match self {
            AbortReason::NoRoutesForStop => "no_routes_found",
            AbortReason::DuplicateSubscription => "already_configured",
            AbortReason::StoreFailed => "store_failed",
        }
    }
}

/// Caller contract violation: a step method called in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("cannot handle {attempted} while {current}")]
    OutOfOrder {
        attempted: StepId,
        current: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(FormError::MissingApiKey.code(), "missing_apikey");
        assert_eq!(FormError::StopNotFound.code(), "no_stops_found");
        assert_eq!(AbortReason::NoRoutesForStop.code(), "no_routes_found");
        assert_eq!(AbortReason::DuplicateSubscription.code(), "already_configured");
    }

    #[test]
    fn step_ids_match_serialized_names() {
        for step in [
            StepId::ApiKey,
            StepId::StopQuery,
            StepId::PickStop,
            StepId::PickRoute,
            StepId::PickDestination,
        ] {
            let json = serde_json::to_value(step).unwrap();
            assert_eq!(json, step.as_str());
        }
    }

    #[test]
    fn out_of_order_display() {
        let err = WizardError::OutOfOrder {
            attempted: StepId::PickRoute,
            current: "awaiting API key",
        };
        assert_eq!(err.to_string(), "cannot handle pick_route while awaiting API key");
    }
}
