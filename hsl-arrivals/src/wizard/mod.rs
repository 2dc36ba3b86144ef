//! Interactive resolution of a subscription: API key, stop, route, destination.

mod error;
mod flow;

pub use error::{AbortReason, FormError, StepId, WizardError};
pub use flow::{FlowStep, Form, ResolutionWizard};
