use thiserror::Error;

use crate::guardrails::{GuardrailCategory, GuardrailDirection};
use crate::sql::ValidationReason;
use crate::workflow::{RejectionReason, TransitionError};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("input blocked by {category:?} guardrail")]
    GuardrailBlock { direction: GuardrailDirection, category: GuardrailCategory },
    #[error("candidate rejected: {reason:?}")]
    CandidateRejected { reason: ValidationReason },
    #[error("retries exhausted: {reason:?}")]
    RetriesExhausted { reason: RejectionReason },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("workflow invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("workflow failure: {0}")]
    Workflow(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("upstream model failure: {0}")]
    Upstream(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<WorkflowError> for ApplicationError {
    fn from(value: WorkflowError) -> Self {
        Self::Workflow(value.to_string())
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Workflow(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Persistence(message) | ApplicationError::Upstream(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, InterfaceError, WorkflowError};
    use crate::guardrails::{GuardrailCategory, GuardrailDirection};

    #[test]
    fn guardrail_block_surfaces_as_bad_request() {
        let workflow = WorkflowError::GuardrailBlock {
            direction: GuardrailDirection::Input,
            category: GuardrailCategory::Injection,
        };
        let interface = ApplicationError::from(workflow).into_interface("req-0");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
    }

    #[test]
    fn workflow_error_maps_to_bad_request_with_correlation_id() {
        let interface = ApplicationError::Workflow("question blocked".to_owned())
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
    }

    #[test]
    fn upstream_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Upstream("model timed out".to_owned()).into_interface("req-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("bad llm provider".to_owned()).into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
