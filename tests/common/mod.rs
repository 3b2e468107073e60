#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use taskgate::{
    ServerConfig,
    client::{ApiRequest, ApiResponse, ClientError, Transport},
    create_app,
    db::Database,
    jwt::{ManualClock, TokenIssuer},
};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const ROTATION_SECRET: &[u8] = b"test-rotation-secret-0123456789abcdef";
pub const PASSWORD: &str = "correct-horse";

/// Fixed starting point so token timestamps are reproducible.
pub const START_TIME: u64 = 1_700_000_000;

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    /// Shared with the server: advancing it ages every issued token
    pub clock: ManualClock,
    /// Same keys and clock as the server, for crafting tokens directly
    pub tokens: TokenIssuer,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Build a test app, letting the caller adjust the config first.
pub async fn create_test_app_with(configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let clock = ManualClock::starting_at(START_TIME);

    let mut config = ServerConfig::new(db.clone(), ACCESS_SECRET.to_vec(), ROTATION_SECRET.to_vec());
    config.clock = Arc::new(clock.clone());
    // Oneshot requests carry no peer address, so they all share one bucket.
    config.auth_rate_limit_per_minute = 1000;
    configure(&mut config);

    let tokens = TokenIssuer::with_clock(ACCESS_SECRET, ROTATION_SECRET, Arc::new(clock.clone()));

    TestApp {
        app: create_app(&config),
        db,
        clock,
        tokens,
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn refresh_request(rotation_token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/auth/refresh");
    if let Some(token) = rotation_token {
        builder = builder.header(header::COOKIE, format!("refresh_token={}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value of the rotation cookie among Set-Cookie headers, if one is set.
pub fn rotation_cookie_value(cookies: &[String]) -> Option<String> {
    cookies.iter().find_map(|c| {
        c.strip_prefix("refresh_token=")
            .and_then(|rest| rest.split(';').next())
            .map(str::to_string)
    })
}

/// A registered account with its initial token pair.
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub rotation_token: String,
}

pub async fn register(app: &TestApp, email: &str) -> Session {
    let response = app
        .send(json_request(
            "POST",
            "/auth/register",
            json!({ "email": email, "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), 201, "registration of {} failed", email);

    let cookies = extract_set_cookies(&response);
    let rotation_token = rotation_cookie_value(&cookies).expect("register sets rotation cookie");
    let body = body_json(response).await;

    Session {
        user_id: body["user"]["id"].as_str().unwrap().to_string(),
        email: email.to_string(),
        access_token: body["accessToken"].as_str().unwrap().to_string(),
        rotation_token,
    }
}

pub async fn create_task(app: &TestApp, token: &str, title: &str) -> Value {
    let response = app
        .send(bearer_request(
            "POST",
            "/tasks",
            token,
            Some(json!({ "title": title })),
        ))
        .await;
    assert_eq!(response.status(), 201);
    body_json(response).await
}

/// In-process transport that drives the router directly and keeps the
/// rotation cookie the way a browser would.
#[derive(Clone)]
pub struct RouterTransport {
    app: Router,
    cookie: Arc<Mutex<Option<String>>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl RouterTransport {
    pub fn new(app: &TestApp) -> Self {
        Self {
            app: app.app.clone(),
            cookie: Arc::new(Mutex::new(None)),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn rotation_cookie(&self) -> Option<String> {
        self.cookie.lock().clone()
    }

    /// Number of requests sent to the given route (query string ignored).
    pub fn count(&self, route: &str) -> usize {
        self.log.lock().iter().filter(|r| r.as_str() == route).count()
    }

    fn store_cookies(&self, response: &Response<Body>) {
        for cookie in extract_set_cookies(response) {
            if let Some(value) = rotation_cookie_value(std::slice::from_ref(&cookie)) {
                let mut jar = self.cookie.lock();
                if value.is_empty() || cookie.contains("Max-Age=0") {
                    *jar = None;
                } else {
                    *jar = Some(value);
                }
            }
        }
    }
}

impl Transport for RouterTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        self.log.lock().push(request.route().to_string());

        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(&request.path);
        if let Some(token) = &request.bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let cookie = self.cookie.lock().clone();
        if let Some(value) = cookie {
            builder = builder.header(header::COOKIE, format!("refresh_token={}", value));
        }
        let body = match &request.body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let http_request = builder
            .body(body)
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let response = self
            .app
            .clone()
            .oneshot(http_request)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        self.store_cookies(&response);

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(ApiResponse::from_bytes(status, &bytes))
    }
}
