//! Session gate: middleware and extractor for bearer-authenticated routes.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::errors::AuthError;
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::jwt::{TokenIssuer, TokenKind};

/// Extract the bearer credential from the `Authorization` header.
/// Returns None for a missing header, a non-Bearer scheme, or an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Core gate logic shared by the middleware and the extractor.
///
/// A missing credential is 401 and an invalid or expired one is 403. The
/// account store is never consulted here.
pub fn authenticate_bearer(
    headers: &HeaderMap,
    tokens: &TokenIssuer,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers).ok_or_else(AuthError::missing_access_token)?;

    let principal = tokens.verify(token, TokenKind::Access).map_err(|e| {
        debug!(reason = %e, "Rejected access token");
        AuthError::invalid_access_token()
    })?;

    Ok(AuthenticatedUser { principal })
}

/// Middleware that rejects requests without a valid access token before they
/// reach any handler, and attaches the principal to the request extensions.
pub async fn session_gate(
    State(tokens): State<Arc<TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate_bearer(request.headers(), &tokens)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for handlers that need the authenticated principal.
/// Uses the identity attached by `session_gate`, or runs the same check itself
/// when the route is not behind the middleware.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(Auth(user.clone()));
        }
        authenticate_bearer(&parts.headers, state.tokens()).map(Auth)
    }
}
