//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why a credential was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No credential was presented
    MissingCredential,
    /// Bad signature, wrong kind, or expired
    InvalidCredential,
    /// Credential was valid but the account no longer exists
    AccountNotFound,
    Internal,
}

/// Credential rejection, rendered as a JSON `{ "error": ... }` response.
#[derive(Debug)]
pub struct AuthError {
    kind: AuthErrorKind,
    message: &'static str,
}

impl AuthError {
    fn new(kind: AuthErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    pub fn missing_access_token() -> Self {
        Self::new(AuthErrorKind::MissingCredential, "Access token required")
    }

    pub fn invalid_access_token() -> Self {
        Self::new(AuthErrorKind::InvalidCredential, "Invalid or expired token")
    }

    pub fn missing_rotation_token() -> Self {
        Self::new(AuthErrorKind::MissingCredential, "Refresh token required")
    }

    pub fn invalid_rotation_token() -> Self {
        Self::new(AuthErrorKind::InvalidCredential, "Invalid refresh token")
    }

    pub fn account_not_found() -> Self {
        Self::new(AuthErrorKind::AccountNotFound, "User not found")
    }

    pub fn internal(message: &'static str) -> Self {
        Self::new(AuthErrorKind::Internal, message)
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::MissingCredential => StatusCode::UNAUTHORIZED,
            AuthErrorKind::InvalidCredential | AuthErrorKind::AccountNotFound => {
                StatusCode::FORBIDDEN
            }
            AuthErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
