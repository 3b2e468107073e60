//! JWT token generation and validation.
//!
//! Two token kinds, each signed with its own secret:
//! - Access tokens: short-lived (15 minutes), presented as a bearer header
//! - Rotation tokens: long-lived (7 days), only ever carried in an HttpOnly cookie
//!
//! Both are stateless. Validity is purely signature + `now < exp`.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Rotation token duration: 7 days
pub const ROTATION_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Token kind, embedded in the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Rotation,
}

impl TokenKind {
    fn duration(&self) -> u64 {
        match self {
            TokenKind::Access => ACCESS_TOKEN_DURATION_SECS,
            TokenKind::Rotation => ROTATION_TOKEN_DURATION_SECS,
        }
    }
}

/// Authenticated identity bound into a token (the user id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Token kind
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to. Cloned handles share the same time,
/// so a test can hold one while the server holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at the current wall-clock time.
    pub fn new() -> Self {
        Self::starting_at(SystemClock.now())
    }

    pub fn starting_at(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Mints and verifies access and rotation tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    access: Arc<KeyPair>,
    rotation: Arc<KeyPair>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Create an issuer backed by the system clock.
    pub fn new(access_secret: &[u8], rotation_secret: &[u8]) -> Self {
        Self::with_clock(access_secret, rotation_secret, Arc::new(SystemClock))
    }

    pub fn with_clock(access_secret: &[u8], rotation_secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        Self {
            access: Arc::new(KeyPair::from_secret(access_secret)),
            rotation: Arc::new(KeyPair::from_secret(rotation_secret)),
            clock,
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Rotation => &self.rotation,
        }
    }

    /// Issue a short-lived access token.
    pub fn issue_access(&self, principal: &Principal) -> Result<IssuedToken, JwtError> {
        self.issue(principal, TokenKind::Access)
    }

    /// Issue a long-lived rotation token.
    pub fn issue_rotation(&self, principal: &Principal) -> Result<IssuedToken, JwtError> {
        self.issue(principal, TokenKind::Rotation)
    }

    fn issue(&self, principal: &Principal, kind: TokenKind) -> Result<IssuedToken, JwtError> {
        let now = self.clock.now();
        let duration = kind.duration();

        let claims = Claims {
            sub: principal.as_str().to_string(),
            kind,
            iat: now,
            exp: now + duration,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.keys(kind).encoding)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
            duration,
        })
    }

    /// Verify a token of the given kind and return its principal.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Principal, JwtError> {
        // Expiry is checked against our own clock below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<Claims>(token, &self.keys(kind).decoding, &validation)
                .map_err(JwtError::Decoding)?;
        let claims = token_data.claims;

        if claims.kind != kind {
            return Err(JwtError::WrongTokenType);
        }

        if self.clock.now() >= claims.exp {
            return Err(JwtError::Expired);
        }

        Ok(Principal(claims.sub))
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Bad signature or malformed token
    Decoding(jsonwebtoken::errors::Error),
    /// Signature valid but `exp` has passed
    Expired,
    /// Wrong token type (e.g., a rotation token presented as an access token)
    WrongTokenType,
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}
