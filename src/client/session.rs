//! Signed-in session on top of the token coordinator.

use parking_lot::Mutex;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info};

use super::coordinator::TokenCoordinator;
use super::error::ClientError;
use super::transport::{ApiRequest, Transport};
use crate::model::{
    AuthResponse, Credentials, MessageResponse, NewTask, Task, TaskPage, TaskQuery, TaskUpdate,
    UserInfo,
};

fn decode<R: DeserializeOwned>(body: Value) -> Result<R, ClientError> {
    serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Query string for a task listing, empty when no filter is set.
fn task_query_string(query: &TaskQuery) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    if let Some(page) = query.page {
        serializer.append_pair("page", &page.to_string());
    }
    if let Some(limit) = query.limit {
        serializer.append_pair("limit", &limit.to_string());
    }
    if let Some(status) = query.status {
        serializer.append_pair("status", status.as_str());
    }
    if let Some(search) = &query.search {
        serializer.append_pair("search", search);
    }
    let encoded = serializer.finish();
    if encoded.is_empty() {
        encoded
    } else {
        format!("?{}", encoded)
    }
}

/// Characters escaped in a single path segment: the URL path set plus the
/// segment separator and the escape character itself.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

fn task_path(id: &str) -> String {
    format!("/tasks/{}", utf8_percent_encode(id, PATH_SEGMENT))
}

pub struct SessionClient<T> {
    coordinator: TokenCoordinator<T>,
    user: Mutex<Option<UserInfo>>,
}

impl<T: Transport> SessionClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            coordinator: TokenCoordinator::new(transport),
            user: Mutex::new(None),
        }
    }

    pub fn coordinator(&self) -> &TokenCoordinator<T> {
        &self.coordinator
    }

    pub fn current_user(&self) -> Option<UserInfo> {
        self.user.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.lock().is_some()
    }

    fn start_session(&self, auth: AuthResponse) -> UserInfo {
        self.coordinator.set_access_token(auth.access_token);
        *self.user.lock() = Some(auth.user.clone());
        auth.user
    }

    fn end_session(&self) {
        self.coordinator.clear_access_token();
        *self.user.lock() = None;
    }

    /// Run a call that needs a session. A final authorization failure means
    /// the session is over, so local state is dropped before returning.
    async fn call<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ClientError> {
        match self.coordinator.execute(request).await {
            Ok(body) => decode(body),
            Err(err) => {
                if err.is_auth_failure() {
                    info!(error = %err, "Session ended");
                    self.end_session();
                }
                Err(err)
            }
        }
    }

    async fn authenticate(&self, path: &str, credentials: &Credentials) -> Result<UserInfo, ClientError> {
        let request = ApiRequest::post(path).with_body(encode(credentials)?);
        let auth: AuthResponse = decode(self.coordinator.execute(request).await?)?;
        Ok(self.start_session(auth))
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<UserInfo, ClientError> {
        self.authenticate("/auth/register", credentials).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserInfo, ClientError> {
        self.authenticate("/auth/login", credentials).await
    }

    /// Resume a session from the rotation cookie, typically on start-up.
    /// Any failure leaves the client signed out.
    pub async fn restore(&self) -> Option<UserInfo> {
        match self.coordinator.refresh().await {
            Ok(auth) => Some(self.start_session(auth)),
            Err(err) => {
                debug!(error = %err, "No session to restore");
                self.end_session();
                None
            }
        }
    }

    /// Tell the server to drop the rotation cookie. Local state is cleared
    /// whether or not that succeeds.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let outcome = self.coordinator.execute(ApiRequest::post("/auth/logout")).await;
        self.end_session();
        outcome.map(|_| ())
    }

    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, ClientError> {
        self.call(ApiRequest::get(format!("/tasks{}", task_query_string(query))))
            .await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ClientError> {
        self.call(ApiRequest::post("/tasks").with_body(encode(task)?))
            .await
    }

    pub async fn get_task(&self, id: &str) -> Result<Task, ClientError> {
        self.call(ApiRequest::get(task_path(id))).await
    }

    pub async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, ClientError> {
        self.call(ApiRequest::patch(task_path(id)).with_body(encode(update)?))
            .await
    }

    pub async fn toggle_task(&self, id: &str) -> Result<Task, ClientError> {
        self.call(ApiRequest::patch(format!("{}/toggle", task_path(id))))
            .await
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ClientError> {
        let _: MessageResponse = self.call(ApiRequest::delete(task_path(id))).await?;
        Ok(())
    }
}
