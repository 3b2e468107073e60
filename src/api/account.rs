//! Account endpoints: register, login, refresh and logout.
//!
//! Register and login issue a fresh token pair: the access token in the body
//! and the rotation token in an HttpOnly cookie. Refresh trades the cookie for
//! a new access token and leaves the cookie untouched.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::{ApiError, ResultExt};
use super::validation::{validate_login, validate_registration};
use crate::auth::{AuthError, CookiePolicy, ROTATION_COOKIE_NAME, get_cookie};
use crate::db::{Database, is_unique_violation};
use crate::jwt::{IssuedToken, Principal, TokenIssuer, TokenKind};
use crate::model::{AuthResponse, Credentials, MessageResponse, UserInfo};
use crate::password::{hash_password, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_auth};

#[derive(Clone)]
pub struct AccountState {
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
    pub cookies: CookiePolicy,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: AccountState) -> Router {
    let limited = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_auth,
        ));

    let open = Router::new()
        .route("/refresh", get(refresh))
        .route("/logout", post(logout))
        .with_state(state);

    Router::new().merge(limited).merge(open)
}

/// Issue an access token and the matching rotation cookie.
fn issue_pair(state: &AccountState, principal: &Principal) -> Result<(IssuedToken, String), ApiError> {
    let access = state
        .tokens
        .issue_access(principal)
        .internal_err("Failed to create access token")?;
    let rotation = state
        .tokens
        .issue_rotation(principal)
        .internal_err("Failed to create refresh token")?;
    Ok((access, state.cookies.rotation_cookie(&rotation)))
}

async fn register(
    State(state): State<AccountState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(credentials) = payload?;
    let email = credentials.email.trim();
    validate_registration(email, &credentials.password)?;

    if state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to look up email")?
        .is_some()
    {
        return Err(ApiError::conflict("Email already exists"));
    }

    let password_hash = hash_password(&credentials.password)
        .await
        .internal_err("Failed to hash password")?;

    let id = uuid::Uuid::new_v4().to_string();
    // Two concurrent registrations can both pass the lookup above.
    state
        .db
        .users()
        .create(&id, email, &password_hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("Email already exists")
            } else {
                ApiError::db_error("Failed to create user", e)
            }
        })?;

    let principal = Principal::new(id.clone());
    let (access, cookie) = issue_pair(&state, &principal)?;

    info!(user_id = %id, "Registered account");

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(AuthResponse {
            access_token: access.token,
            user: UserInfo {
                id,
                email: email.to_string(),
            },
        }),
    ))
}

async fn login(
    State(state): State<AccountState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(credentials) = payload?;
    let email = credentials.email.trim();
    validate_login(email, &credentials.password)?;

    let Some(user) = state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to look up user")?
    else {
        debug!("Login for unknown email");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let matches = verify_password(&credentials.password, &user.password_hash)
        .await
        .internal_err("Failed to verify password")?;
    if !matches {
        debug!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let principal = Principal::new(user.id.clone());
    let (access, cookie) = issue_pair(&state, &principal)?;

    info!(user_id = %user.id, "Logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(AuthResponse {
            access_token: access.token,
            user: user.info(),
        }),
    ))
}

/// Exchange the rotation cookie for a new access token.
///
/// The cookie is not re-issued: it keeps its original expiry and the client
/// must log in again once it lapses.
async fn refresh(
    State(state): State<AccountState>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, AuthError> {
    let token = get_cookie(&headers, ROTATION_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .ok_or_else(AuthError::missing_rotation_token)?;

    let principal = state
        .tokens
        .verify(token, TokenKind::Rotation)
        .map_err(|e| {
            debug!(reason = %e, "Rejected refresh token");
            AuthError::invalid_rotation_token()
        })?;

    let user = state
        .db
        .users()
        .get_by_id(principal.as_str())
        .await
        .map_err(|e| {
            error!("Failed to look up user for refresh: {}", e);
            AuthError::internal("Database error")
        })?
        .ok_or_else(|| {
            warn!(user_id = %principal, "Refresh token for deleted account");
            AuthError::account_not_found()
        })?;

    let access = state.tokens.issue_access(&principal).map_err(|e| {
        error!("Failed to create access token: {}", e);
        AuthError::internal("Failed to create access token")
    })?;

    debug!(user_id = %user.id, "Refreshed access token");

    Ok(Json(AuthResponse {
        access_token: access.token,
        user: user.info(),
    }))
}

async fn logout(State(state): State<AccountState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, state.cookies.clear_rotation_cookie())],
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}
