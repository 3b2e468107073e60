//! Cookie parsing and rotation cookie formatting.

use axum::http::header;

use crate::jwt::IssuedToken;

/// Cookie name for the rotation token (long-lived, 7 days).
pub const ROTATION_COOKIE_NAME: &str = "refresh_token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Transport attributes for the rotation cookie.
///
/// Production deployments serve the API from a different origin than the
/// frontend, so the cookie must be `SameSite=None`, which browsers only
/// accept together with `Secure`. Development keeps `SameSite=Strict` so it
/// works over plain HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn development() -> Self {
        Self { secure: false }
    }

    pub fn production() -> Self {
        Self { secure: true }
    }

    fn attributes(&self) -> &'static str {
        if self.secure {
            "; SameSite=None; Secure"
        } else {
            "; SameSite=Strict"
        }
    }

    /// `Set-Cookie` value carrying a freshly issued rotation token.
    pub fn rotation_cookie(&self, token: &IssuedToken) -> String {
        format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}{}",
            ROTATION_COOKIE_NAME,
            token.token,
            token.duration,
            self.attributes()
        )
    }

    /// `Set-Cookie` value that removes the rotation cookie.
    pub fn clear_rotation_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; Path=/; Max-Age=0{}",
            ROTATION_COOKIE_NAME,
            self.attributes()
        )
    }
}
