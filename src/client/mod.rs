//! API client with transparent access-token refresh.

mod coordinator;
mod error;
mod session;
mod transport;

pub use coordinator::{REFRESH_PATH, RequestAttempt, TokenCoordinator};
pub use error::ClientError;
pub use session::SessionClient;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
