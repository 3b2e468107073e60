//! Authentication state trait and macro.

use crate::jwt::TokenIssuer;

/// State types that can verify access tokens.
pub trait HasAuthBackend {
    fn tokens(&self) -> &TokenIssuer;
}

/// Implement `HasAuthBackend` for a state struct with a
/// `tokens: Arc<TokenIssuer>` field.
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub tokens: Arc<TokenIssuer>,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn tokens(&self) -> &$crate::jwt::TokenIssuer {
                &self.tokens
            }
        }
    };
}
