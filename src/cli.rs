//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::CookiePolicy;
use crate::db::Database;
use crate::rate_limit::DEFAULT_AUTH_REQUESTS_PER_MINUTE;
use clap::Parser;
use tracing::{error, info};
use url::Url;

const MIN_SECRET_LENGTH: usize = 32;

pub const ACCESS_SECRET_ENV: &str = "JWT_SECRET";
pub const ROTATION_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskgate",
    about = "Task manager API with short-lived access tokens and cookie-based refresh"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "4000")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, env = "DATABASE_PATH", default_value = "taskgate.db")]
    pub database: String,

    /// Path to file containing the access token secret. Prefer the JWT_SECRET env var
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer the REFRESH_TOKEN_SECRET env var
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Production mode: the refresh cookie becomes SameSite=None; Secure (requires HTTPS)
    #[arg(long, env = "PRODUCTION")]
    pub production: bool,

    /// Frontend origin allowed to call the API with credentials (repeatable)
    #[arg(long = "allowed-origin", value_parser = validate_origin,
        default_values_t = crate::DEFAULT_ALLOWED_ORIGINS.map(String::from))]
    pub allowed_origins: Vec<String>,

    /// Login and register requests allowed per minute per client IP
    #[arg(long, default_value_t = DEFAULT_AUTH_REQUESTS_PER_MINUTE)]
    pub auth_rate_limit: u32,

    /// Rate limit on the first X-Forwarded-For entry (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Origins must be bare `scheme://host[:port]` values, as browsers send them.
fn validate_origin(s: &str) -> Result<String, String> {
    let url = Url::parse(s).map_err(|e| format!("Invalid origin {}: {}", s, e))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("Origin must use http or https: {}", s));
    }

    if url.host_str().is_none() {
        return Err(format!("Origin must have a host: {}", s));
    }

    // Url::parse normalizes "http://a" to "http://a/"; anything longer has a path.
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(format!("Origin must not contain a path: {}", s));
    }

    Ok(s.trim_end_matches('/').to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a signing secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>, file_flag: &str) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "Secret is required. Set the {} environment variable (recommended) or use {}",
            env_var, file_flag
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load both signing secrets. They must differ so neither token kind can be
/// forged from the other's key.
pub fn load_secrets(
    jwt_secret_file: Option<&str>,
    refresh_secret_file: Option<&str>,
) -> Option<(String, String)> {
    let access = load_secret(ACCESS_SECRET_ENV, jwt_secret_file, "--jwt-secret-file")?;
    let rotation = load_secret(
        ROTATION_SECRET_ENV,
        refresh_secret_file,
        "--refresh-secret-file",
    )?;

    if access == rotation {
        error!(
            "{} and {} must be different",
            ACCESS_SECRET_ENV, ROTATION_SECRET_ENV
        );
        return None;
    }

    Some((access, rotation))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    access_secret: String,
    rotation_secret: String,
) -> ServerConfig {
    let cookies = if args.production {
        CookiePolicy::production()
    } else {
        CookiePolicy::development()
    };

    ServerConfig {
        cookies,
        allowed_origins: args.allowed_origins.clone(),
        auth_rate_limit_per_minute: args.auth_rate_limit,
        trust_forwarded_for: args.trust_forwarded_for,
        ..ServerConfig::new(db, access_secret.into_bytes(), rotation_secret.into_bytes())
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
