pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod db;
pub mod jwt;
pub mod model;
pub mod password;
pub mod rate_limit;

use api::create_api_router;
use auth::CookiePolicy;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use db::Database;
use jwt::{Clock, SystemClock, TokenIssuer};
use rate_limit::{DEFAULT_AUTH_REQUESTS_PER_MINUTE, RateLimitConfig, spawn_limiter_cleanup};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

/// Frontend origins allowed by default during development.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

/// Body of the liveness route.
pub const LIVENESS_MESSAGE: &str = "TaskManager API is running";

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing rotation tokens, distinct from `access_secret`
    pub rotation_secret: Vec<u8>,
    /// Attributes of the rotation cookie (production requires HTTPS)
    pub cookies: CookiePolicy,
    /// Origins allowed to make credentialed cross-origin requests
    pub allowed_origins: Vec<String>,
    /// Login and register budget per client IP
    pub auth_rate_limit_per_minute: u32,
    /// Key rate limiting on `X-Forwarded-For` (requires running behind a proxy)
    pub trust_forwarded_for: bool,
    /// Time source for token issuance and expiry checks
    pub clock: Arc<dyn Clock>,
}

impl ServerConfig {
    /// Development defaults around the given database and secrets.
    pub fn new(db: Database, access_secret: Vec<u8>, rotation_secret: Vec<u8>) -> Self {
        Self {
            db,
            access_secret,
            rotation_secret,
            cookies: CookiePolicy::development(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
            auth_rate_limit_per_minute: DEFAULT_AUTH_REQUESTS_PER_MINUTE,
            trust_forwarded_for: false,
            clock: Arc::new(SystemClock),
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid allowed origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Create the application router with the given configuration.
/// Must be called inside a tokio runtime: it spawns the limiter cleanup task.
pub fn create_app(config: &ServerConfig) -> Router {
    let tokens = Arc::new(TokenIssuer::with_clock(
        &config.access_secret,
        &config.rotation_secret,
        config.clock.clone(),
    ));

    let rate_limit_config = Arc::new(RateLimitConfig::new(
        config.auth_rate_limit_per_minute,
        config.trust_forwarded_for,
    ));
    spawn_limiter_cleanup(rate_limit_config.clone());

    let api_router = create_api_router(
        config.db.clone(),
        tokens,
        config.cookies,
        rate_limit_config,
    );

    Router::new()
        .route("/", get(|| async { LIVENESS_MESSAGE }))
        .merge(api_router)
        .layer(cors_layer(&config.allowed_origins))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
