//! Bearer-token session gate and rotation cookie handling.
//!
//! Access tokens travel in the `Authorization` header and are checked
//! statelessly on every protected request. The rotation token lives only in
//! an HttpOnly cookie and is read solely by the refresh endpoint.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{CookiePolicy, ROTATION_COOKIE_NAME, get_cookie};
pub use errors::{AuthError, AuthErrorKind};
pub use extractors::{Auth, authenticate_bearer, bearer_token, session_gate};
pub use ip::extract_client_ip;
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
