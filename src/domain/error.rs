//! Domain error types for the herald event handler.
//!
//! All error enums use thiserror. `ControlPlaneError` carries the
//! transiency predicates the submitter relies on to decide between
//! retrying and discarding.

use thiserror::Error;

/// Errors surfaced synchronously by `TaskEventHandler::submit`.
///
/// Submission to the control plane is asynchronous; the only failures a
/// caller sees are classification failures of the inbound event itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The state change event carries no task ARN to shard on.
    #[error("state change event has no task arn")]
    MissingTaskArn,
}

/// Errors returned by the remote control-plane client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlPlaneError {
    /// The submission was permanently rejected; it will never succeed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The control plane asked us to slow down.
    #[error("request throttled")]
    Throttled,

    /// The control plane is temporarily unavailable.
    #[error("service unavailable")]
    ServiceUnavailable,

    /// The request failed in transit.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Client-side failure unrelated to the remote endpoint.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlPlaneError {
    /// Returns true if the submission was permanently rejected and the
    /// offending event must be dropped instead of retried.
    pub const fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }

    /// Returns true if this error could succeed on retry.
    pub const fn is_transient(&self) -> bool {
        !self.is_invalid_parameter()
    }
}

/// Errors from the durable sent-status store.
///
/// These are logged and never fail an otherwise successful submission:
/// once the control plane has accepted a change, the change counts as
/// sent whether or not the marker could be persisted.
#[derive(Error, Debug)]
pub enum SentStatusError {
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("write failed: {0}")]
    WriteFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_is_permanent() {
        let err = ControlPlaneError::InvalidParameter("bad field".to_string());
        assert!(err.is_invalid_parameter());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_other_errors_are_transient() {
        assert!(ControlPlaneError::Throttled.is_transient());
        assert!(ControlPlaneError::ServiceUnavailable.is_transient());
        assert!(ControlPlaneError::RequestFailed("timeout".to_string()).is_transient());
        assert!(ControlPlaneError::Internal("oops".to_string()).is_transient());
    }
}
