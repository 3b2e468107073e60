//! Client-side error type.

use reqwest::StatusCode;

/// Failure of a client call, cloneable so one refresh outcome can be handed to
/// every queued caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {message}.")]
    Status { status: StatusCode, message: String },
    /// The request never produced a response.
    #[error("Transport failure: {0}.")]
    Transport(String),
    /// The response body did not have the expected shape.
    #[error("Response body could not be decoded: {0}.")]
    Decode(String),
    /// The caller performing a refresh went away before it settled.
    #[error("Token refresh was abandoned before it settled.")]
    RefreshAbandoned,
    /// The session was ended or replaced while a refresh was in flight.
    #[error("Session changed while the token was being refreshed.")]
    SessionChanged,
}

impl ClientError {
    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for the authorization-failure class (401 and 403).
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.status(),
            Some(s) if s == StatusCode::UNAUTHORIZED || s == StatusCode::FORBIDDEN
        )
    }
}
