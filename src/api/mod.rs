mod account;
mod error;
mod tasks;
mod validation;

use axum::Router;
use std::sync::Arc;

use crate::auth::CookiePolicy;
use crate::db::Database;
use crate::jwt::TokenIssuer;
use crate::rate_limit::RateLimitConfig;

pub use account::AccountState;
pub use error::ApiError;
pub use tasks::TasksState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    tokens: Arc<TokenIssuer>,
    cookies: CookiePolicy,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let account_state = account::AccountState {
        db: db.clone(),
        tokens: tokens.clone(),
        cookies,
        rate_limit_config,
    };

    let tasks_state = tasks::TasksState { db, tokens };

    Router::new()
        .nest("/auth", account::router(account_state))
        .nest("/tasks", tasks::router(tasks_state))
}
