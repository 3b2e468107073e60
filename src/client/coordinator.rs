//! Client token coordinator.
//!
//! Attaches the in-memory access token to every call and recovers from
//! authorization failures with at most one refresh in flight. Callers that
//! fail while a refresh is running queue behind it and are released in FIFO
//! order with the shared outcome.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::ClientError;
use super::transport::{ApiRequest, Transport};
use crate::model::AuthResponse;

/// Endpoint that exchanges the rotation cookie for a new access token.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Calls under this prefix are part of the credential flow and never trigger
/// a refresh themselves.
const CREDENTIAL_PREFIX: &str = "/auth/";

type Continuation = oneshot::Sender<Result<AuthResponse, ClientError>>;

struct RefreshState {
    access_token: Option<String>,
    /// Bumped whenever the token is replaced or cleared from outside a
    /// refresh. A refresh that started in an older epoch must not install its
    /// token.
    epoch: u64,
    refreshing: bool,
    waiters: VecDeque<Continuation>,
}

/// One logical call and its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    pub request: ApiRequest,
    /// Set once the call has been through recovery; a retried call is final
    pub retried: bool,
    /// Access token attached on the most recent send
    pub sent_with: Option<String>,
}

impl RequestAttempt {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
            sent_with: None,
        }
    }

    /// Whether an authorization failure on this attempt may start recovery.
    pub fn can_recover(&self) -> bool {
        !self.retried && !self.request.route().starts_with(CREDENTIAL_PREFIX)
    }
}

enum Recovery {
    /// Perform the refresh and release everyone queued behind it
    Lead,
    /// Wait for the refresh already in flight
    Follow(oneshot::Receiver<Result<AuthResponse, ClientError>>),
    /// A refresh settled after this attempt was sent; just resend
    Replay,
}

pub struct TokenCoordinator<T> {
    transport: T,
    state: Mutex<RefreshState>,
}

impl<T: Transport> TokenCoordinator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(RefreshState {
                access_token: None,
                epoch: 0,
                refreshing: false,
                waiters: VecDeque::new(),
            }),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.lock().access_token.clone()
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        let mut state = self.state.lock();
        state.access_token = Some(token.into());
        state.epoch += 1;
    }

    /// Drop the token. A refresh still in flight settles without installing
    /// its result, and its callers fail with `SessionChanged`.
    pub fn clear_access_token(&self) {
        let mut state = self.state.lock();
        state.access_token = None;
        state.epoch += 1;
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers queued behind the refresh in flight.
    pub fn pending_waiters(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Send a request with the current access token, recovering once from an
    /// authorization failure. Returns the success body.
    pub async fn execute(&self, request: ApiRequest) -> Result<Value, ClientError> {
        let mut attempt = RequestAttempt::new(request);

        match self.dispatch(&mut attempt).await {
            Err(err) if err.is_auth_failure() && attempt.can_recover() => {
                debug!(
                    path = %attempt.request.route(),
                    status = ?err.status(),
                    "Authorization failed, recovering"
                );
            }
            outcome => return outcome,
        }

        attempt.retried = true;
        self.recover(&attempt).await?;
        self.dispatch(&mut attempt).await
    }

    /// Obtain a new access token, joining the refresh in flight if there is one.
    pub async fn refresh(&self) -> Result<AuthResponse, ClientError> {
        let waiter = {
            let mut state = self.state.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Some(rx)
            } else {
                state.refreshing = true;
                None
            }
        };

        match waiter {
            Some(rx) => Self::wait(rx).await,
            None => self.lead_refresh().await,
        }
    }

    async fn dispatch(&self, attempt: &mut RequestAttempt) -> Result<Value, ClientError> {
        let token = self.access_token();
        attempt.request.bearer = token.clone();
        attempt.sent_with = token;
        self.transport.send(&attempt.request).await?.into_result()
    }

    async fn recover(&self, attempt: &RequestAttempt) -> Result<(), ClientError> {
        let recovery = {
            let mut state = self.state.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Recovery::Follow(rx)
            } else if state.access_token.is_some() && state.access_token != attempt.sent_with {
                Recovery::Replay
            } else {
                state.refreshing = true;
                Recovery::Lead
            }
        };

        match recovery {
            Recovery::Lead => self.lead_refresh().await.map(|_| ()),
            Recovery::Follow(rx) => Self::wait(rx).await.map(|_| ()),
            Recovery::Replay => {
                debug!("Token changed since the request was sent, replaying");
                Ok(())
            }
        }
    }

    async fn wait(
        rx: oneshot::Receiver<Result<AuthResponse, ClientError>>,
    ) -> Result<AuthResponse, ClientError> {
        rx.await.unwrap_or(Err(ClientError::RefreshAbandoned))
    }

    /// Caller must have set `refreshing`. The guard hands the state back to
    /// Idle even if this future is dropped mid-flight.
    async fn lead_refresh(&self) -> Result<AuthResponse, ClientError> {
        let mut guard = RefreshGuard {
            state: &self.state,
            epoch: self.state.lock().epoch,
            settled: false,
        };

        debug!("Refreshing access token");
        let mut attempt = RequestAttempt::new(ApiRequest::get(REFRESH_PATH));
        let outcome = match self.dispatch(&mut attempt).await {
            Ok(body) => serde_json::from_value::<AuthResponse>(body)
                .map_err(|e| ClientError::Decode(e.to_string())),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(_) => debug!("Access token refreshed"),
            Err(err) => warn!(error = %err, "Token refresh failed"),
        }

        guard.settle(outcome)
    }
}

struct RefreshGuard<'a> {
    state: &'a Mutex<RefreshState>,
    /// Epoch the refresh started in
    epoch: u64,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Return to Idle and release every queued caller with the outcome. A
    /// success is discarded if the session changed while it was in flight.
    fn settle(
        &mut self,
        outcome: Result<AuthResponse, ClientError>,
    ) -> Result<AuthResponse, ClientError> {
        self.settled = true;

        let (outcome, waiters) = {
            let mut state = self.state.lock();
            let outcome = match outcome {
                Ok(_) if state.epoch != self.epoch => {
                    debug!("Session changed during refresh, discarding token");
                    Err(ClientError::SessionChanged)
                }
                Ok(auth) => {
                    state.access_token = Some(auth.access_token.clone());
                    Ok(auth)
                }
                Err(err) => Err(err),
            };
            state.refreshing = false;
            (outcome, std::mem::take(&mut state.waiters))
        };

        // A waiter whose caller has gone away is simply skipped.
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        outcome
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Token refresh abandoned, releasing queued callers");
            let _ = self.settle(Err(ClientError::RefreshAbandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::ApiResponse;
    use crate::model::UserInfo;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// In-memory server: `/tasks` accepts only the current token, refresh
    /// mints the next one once the gate lets it through.
    struct MockTransport {
        valid_token: Mutex<String>,
        refresh_ok: bool,
        refresh_calls: AtomicUsize,
        task_calls: AtomicUsize,
        gate: Semaphore,
        sent: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        fn new(valid_token: &str, refresh_ok: bool) -> Self {
            Self {
                valid_token: Mutex::new(valid_token.to_string()),
                refresh_ok,
                refresh_calls: AtomicUsize::new(0),
                task_calls: AtomicUsize::new(0),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
                sent: Mutex::new(Vec::new()),
            }
        }

        /// Refresh calls block until `open_gate` is called.
        fn gated(valid_token: &str, refresh_ok: bool) -> Self {
            Self {
                gate: Semaphore::new(0),
                ..Self::new(valid_token, refresh_ok)
            }
        }

        fn open_gate(&self) {
            self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }

        fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }

        fn task_calls(&self) -> usize {
            self.task_calls.load(Ordering::SeqCst)
        }
    }

    fn error(status: StatusCode, message: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: json!({ "error": message }),
        }
    }

    impl Transport for MockTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
            self.sent.lock().push(request.clone());

            match request.route() {
                REFRESH_PATH => {
                    let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
                    let _permit = self
                        .gate
                        .acquire()
                        .await
                        .map_err(|e| ClientError::Transport(e.to_string()))?;
                    if !self.refresh_ok {
                        return Ok(error(StatusCode::FORBIDDEN, "Invalid refresh token"));
                    }
                    let token = format!("fresh-{}", n);
                    *self.valid_token.lock() = token.clone();
                    Ok(ApiResponse {
                        status: StatusCode::OK,
                        body: json!({
                            "accessToken": token,
                            "user": { "id": "u1", "email": "alice@example.com" }
                        }),
                    })
                }
                "/tasks" => {
                    self.task_calls.fetch_add(1, Ordering::SeqCst);
                    let valid = self.valid_token.lock().clone();
                    match request.bearer.as_deref() {
                        None => Ok(error(StatusCode::UNAUTHORIZED, "Access token required")),
                        Some(token) if token == valid => Ok(ApiResponse {
                            status: StatusCode::OK,
                            body: json!({ "seen": token }),
                        }),
                        Some(_) => Ok(error(StatusCode::FORBIDDEN, "Invalid or expired token")),
                    }
                }
                "/boom" => Err(ClientError::Transport("connection reset".into())),
                _ => Ok(error(StatusCode::NOT_FOUND, "Not found")),
            }
        }
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        while !condition() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_valid_token_is_attached_and_no_refresh() {
        let coordinator = TokenCoordinator::new(MockTransport::new("good", true));
        coordinator.set_access_token("good");

        let body = coordinator.execute(ApiRequest::get("/tasks")).await.unwrap();

        assert_eq!(body, json!({ "seen": "good" }));
        assert_eq!(coordinator.transport().refresh_calls(), 0);
        assert_eq!(
            coordinator.transport().sent.lock()[0].bearer.as_deref(),
            Some("good")
        );
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_and_replays() {
        let coordinator = TokenCoordinator::new(MockTransport::new("current", true));
        coordinator.set_access_token("expired");

        let body = coordinator.execute(ApiRequest::get("/tasks")).await.unwrap();

        assert_eq!(body, json!({ "seen": "fresh-1" }));
        assert_eq!(coordinator.access_token().as_deref(), Some("fresh-1"));
        assert_eq!(coordinator.transport().refresh_calls(), 1);
        assert_eq!(coordinator.transport().task_calls(), 2);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_missing_token_401_also_recovers() {
        let coordinator = TokenCoordinator::new(MockTransport::new("current", true));

        let body = coordinator.execute(ApiRequest::get("/tasks")).await.unwrap();

        assert_eq!(body, json!({ "seen": "fresh-1" }));
        assert_eq!(coordinator.transport().refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_failures_share_one_refresh() {
        let coordinator = TokenCoordinator::new(MockTransport::gated("current", true));
        coordinator.set_access_token("expired");

        let release = async {
            wait_until(|| coordinator.pending_waiters() == 2).await;
            assert!(coordinator.is_refreshing());
            coordinator.transport().open_gate();
        };

        let (a, b, c, ()) = tokio::join!(
            coordinator.execute(ApiRequest::get("/tasks")),
            coordinator.execute(ApiRequest::get("/tasks")),
            coordinator.execute(ApiRequest::get("/tasks")),
            release,
        );

        for result in [a, b, c] {
            assert_eq!(result.unwrap(), json!({ "seen": "fresh-1" }));
        }
        assert_eq!(coordinator.transport().refresh_calls(), 1);
        assert_eq!(coordinator.pending_waiters(), 0);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_failure_rejects_every_waiter() {
        let coordinator = TokenCoordinator::new(MockTransport::gated("current", false));
        coordinator.set_access_token("expired");

        let release = async {
            wait_until(|| coordinator.pending_waiters() == 2).await;
            coordinator.transport().open_gate();
        };

        let (a, b, c, ()) = tokio::join!(
            coordinator.execute(ApiRequest::get("/tasks")),
            coordinator.execute(ApiRequest::get("/tasks")),
            coordinator.execute(ApiRequest::get("/tasks")),
            release,
        );

        for result in [a, b, c] {
            let err = result.unwrap_err();
            assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
            assert!(err.to_string().contains("Invalid refresh token"));
        }
        assert_eq!(coordinator.transport().refresh_calls(), 1);
        // No call was replayed after the failed refresh.
        assert_eq!(coordinator.transport().task_calls(), 3);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.access_token().as_deref(), Some("expired"));
    }

    #[tokio::test]
    async fn test_replay_failure_is_final() {
        // Refresh succeeds but the server still rejects: valid_token never matches.
        struct Stubborn(AtomicUsize);

        impl Transport for Stubborn {
            async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
                if request.route() == REFRESH_PATH {
                    self.0.fetch_add(1, Ordering::SeqCst);
                    return Ok(ApiResponse {
                        status: StatusCode::OK,
                        body: json!({
                            "accessToken": "new",
                            "user": { "id": "u1", "email": "alice@example.com" }
                        }),
                    });
                }
                Ok(error(StatusCode::FORBIDDEN, "Invalid or expired token"))
            }
        }

        let coordinator = TokenCoordinator::new(Stubborn(AtomicUsize::new(0)));
        coordinator.set_access_token("old");

        let err = coordinator
            .execute(ApiRequest::get("/tasks"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(coordinator.transport().0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_path_failure_is_not_recovered() {
        let coordinator = TokenCoordinator::new(MockTransport::new("current", false));

        let err = coordinator
            .execute(ApiRequest::get(REFRESH_PATH))
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(coordinator.transport().refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_credential_calls_are_not_recovered() {
        struct RejectLogin;

        impl Transport for RejectLogin {
            async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
                assert_ne!(request.route(), REFRESH_PATH, "login must not trigger refresh");
                Ok(error(StatusCode::UNAUTHORIZED, "Invalid credentials"))
            }
        }

        let coordinator = TokenCoordinator::new(RejectLogin);
        let err = coordinator
            .execute(ApiRequest::post("/auth/login").with_body(json!({})))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Status {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid credentials".into()
            }
        );
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let coordinator = TokenCoordinator::new(MockTransport::new("current", true));
        coordinator.set_access_token("current");

        let not_found = coordinator
            .execute(ApiRequest::get("/missing"))
            .await
            .unwrap_err();
        assert_eq!(not_found.status(), Some(StatusCode::NOT_FOUND));

        let transport = coordinator
            .execute(ApiRequest::get("/boom"))
            .await
            .unwrap_err();
        assert_eq!(transport, ClientError::Transport("connection reset".into()));

        assert_eq!(coordinator.transport().refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_waiters_replay_in_arrival_order() {
        let coordinator = Arc::new(TokenCoordinator::new(MockTransport::gated("current", true)));
        coordinator.set_access_token("expired");

        let call = |n: usize| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .execute(ApiRequest::get(format!("/tasks?caller={}", n)))
                    .await
            })
        };

        let leader = call(0);
        wait_until(|| coordinator.is_refreshing()).await;
        let mut followers = Vec::new();
        for n in 1..=4 {
            followers.push(call(n));
            wait_until(|| coordinator.pending_waiters() == n).await;
        }

        coordinator.transport().open_gate();
        leader.await.unwrap().unwrap();
        for follower in followers {
            follower.await.unwrap().unwrap();
        }

        let replays: Vec<String> = coordinator
            .transport()
            .sent
            .lock()
            .iter()
            .filter(|r| r.bearer.as_deref() == Some("fresh-1"))
            .map(|r| r.path.clone())
            .filter(|path| path != "/tasks?caller=0")
            .collect();
        assert_eq!(
            replays,
            vec![
                "/tasks?caller=1",
                "/tasks?caller=2",
                "/tasks?caller=3",
                "/tasks?caller=4",
            ]
        );
        assert_eq!(coordinator.transport().refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_cleared_token_is_not_restored_by_refresh() {
        let coordinator = Arc::new(TokenCoordinator::new(MockTransport::gated("current", true)));
        coordinator.set_access_token("expired");

        let leader = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.execute(ApiRequest::get("/tasks")).await }
        });
        wait_until(|| coordinator.is_refreshing()).await;

        coordinator.clear_access_token();
        coordinator.transport().open_gate();

        let err = leader.await.unwrap().unwrap_err();
        assert_eq!(err, ClientError::SessionChanged);
        assert_eq!(coordinator.access_token(), None);
        assert!(!coordinator.is_refreshing());
        // The call was not replayed with the discarded token.
        assert_eq!(coordinator.transport().task_calls(), 1);
    }

    #[tokio::test]
    async fn test_late_rejection_replays_with_newer_token() {
        // `/tasks` decides validity when the request arrives, but a stale
        // request's rejection is held back until `hold` is released.
        struct SlowReject {
            valid_token: Mutex<String>,
            hold: Semaphore,
            refresh_calls: AtomicUsize,
            sent: AtomicUsize,
        }

        impl Transport for SlowReject {
            async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
                self.sent.fetch_add(1, Ordering::SeqCst);
                if request.route() == REFRESH_PATH {
                    self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                    *self.valid_token.lock() = "fresh".into();
                    return Ok(ApiResponse {
                        status: StatusCode::OK,
                        body: json!({
                            "accessToken": "fresh",
                            "user": { "id": "u1", "email": "alice@example.com" }
                        }),
                    });
                }

                let valid = self.valid_token.lock().clone();
                match request.bearer.as_deref() {
                    Some(token) if token == valid => Ok(ApiResponse {
                        status: StatusCode::OK,
                        body: json!({ "seen": token }),
                    }),
                    _ => {
                        if request.path == "/tasks?slow" {
                            let _permit = self
                                .hold
                                .acquire()
                                .await
                                .map_err(|e| ClientError::Transport(e.to_string()))?;
                        }
                        Ok(error(StatusCode::FORBIDDEN, "Invalid or expired token"))
                    }
                }
            }
        }

        let coordinator = Arc::new(TokenCoordinator::new(SlowReject {
            valid_token: Mutex::new("current".into()),
            hold: Semaphore::new(0),
            refresh_calls: AtomicUsize::new(0),
            sent: AtomicUsize::new(0),
        }));
        coordinator.set_access_token("expired");

        let slow = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.execute(ApiRequest::get("/tasks?slow")).await }
        });
        wait_until(|| coordinator.transport().sent.load(Ordering::SeqCst) == 1).await;

        // A second call fails, refreshes and succeeds while the first is held.
        let fast = coordinator.execute(ApiRequest::get("/tasks")).await.unwrap();
        assert_eq!(fast, json!({ "seen": "fresh" }));
        assert_eq!(coordinator.transport().refresh_calls.load(Ordering::SeqCst), 1);

        coordinator.transport().hold.add_permits(1);
        let body = slow.await.unwrap().unwrap();

        assert_eq!(body, json!({ "seen": "fresh" }));
        assert_eq!(coordinator.transport().refresh_calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_stale_token_replays_without_refresh() {
        let coordinator = TokenCoordinator::new(MockTransport::new("newer", true));
        coordinator.set_access_token("newer");

        let mut attempt = RequestAttempt::new(ApiRequest::get("/tasks"));
        attempt.sent_with = Some("older".into());
        attempt.retried = true;
        coordinator.recover(&attempt).await.unwrap();

        assert_eq!(coordinator.transport().refresh_calls(), 0);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_explicit_refresh_joins_flight() {
        let coordinator = TokenCoordinator::new(MockTransport::gated("current", true));

        let release = async {
            wait_until(|| coordinator.pending_waiters() == 1).await;
            coordinator.transport().open_gate();
        };

        let (first, second, ()) = tokio::join!(coordinator.refresh(), coordinator.refresh(), release);

        assert_eq!(first.unwrap().access_token, "fresh-1");
        let second = second.unwrap();
        assert_eq!(second.access_token, "fresh-1");
        assert_eq!(
            second.user,
            UserInfo {
                id: "u1".into(),
                email: "alice@example.com".into()
            }
        );
        assert_eq!(coordinator.transport().refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_refresh_releases_waiters() {
        let coordinator = Arc::new(TokenCoordinator::new(MockTransport::gated("current", true)));
        coordinator.set_access_token("expired");

        let leader = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.execute(ApiRequest::get("/tasks")).await }
        });
        wait_until(|| coordinator.is_refreshing()).await;

        let follower = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.execute(ApiRequest::get("/tasks")).await }
        });
        wait_until(|| coordinator.pending_waiters() == 1).await;

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        let err = follower.await.unwrap().unwrap_err();
        assert_eq!(err, ClientError::RefreshAbandoned);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending_waiters(), 0);
        assert_eq!(coordinator.access_token().as_deref(), Some("expired"));
    }
}
