//! Authentication user types.

use crate::jwt::Principal;

/// Identity attached to a request once its access token has been verified.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub principal: Principal,
}

impl AuthenticatedUser {
    /// Database user ID of the principal.
    pub fn user_id(&self) -> &str {
        self.principal.as_str()
    }
}
