//! Typed client for the HTTP API, covering the seam the web frontend uses:
//! every request carries the stored bearer token, an authentication failure
//! tears the whole session down and hands control to the login redirect
//! hook, and a fixed timeout bounds pending calls.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::dto::PublicUser;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Local session state: bearer token, the logged-in user, and the user type
/// shown in the UI. Cleared wholesale when the server reports a 401.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn store(&self, token: String, user: PublicUser, user_type: String);
    fn clear(&self);
}

#[derive(Default)]
struct SessionData {
    token: Option<String>,
    user: Option<PublicUser>,
    user_type: Option<String>,
}

/// In-memory [`SessionStore`], the counterpart of browser local storage.
#[derive(Default)]
pub struct MemorySession {
    inner: RwLock<SessionData>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<PublicUser> {
        self.inner.read().expect("session lock poisoned").user.clone()
    }

    pub fn user_type(&self) -> Option<String> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .user_type
            .clone()
    }
}

impl SessionStore for MemorySession {
    fn token(&self) -> Option<String> {
        self.inner.read().expect("session lock poisoned").token.clone()
    }

    fn store(&self, token: String, user: PublicUser, user_type: String) {
        let mut data = self.inner.write().expect("session lock poisoned");
        data.token = Some(token);
        data.user = Some(user);
        data.user_type = Some(user_type);
    }

    fn clear(&self) {
        let mut data = self.inner.write().expect("session lock poisoned");
        *data = SessionData::default();
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,

    /// The server answered 401; the local session has already been cleared.
    #[error("session is no longer authenticated")]
    Unauthorized,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(reqwest::Error),
}

/// Registration form mirrored from the register endpoint's request body.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthSuccess {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Deserialize)]
struct MeBody {
    user: PublicUser,
}

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    pub environment: String,
}

#[derive(Debug, Deserialize)]
struct FailureBody {
    message: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
    on_unauthorized: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, session, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        session: Arc<dyn SessionStore>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            on_unauthorized: None,
        })
    }

    /// Hook invoked after a 401 has cleared the session; the UI wires its
    /// navigation to the login entry point here.
    pub fn on_unauthorized(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_unauthorized = Some(Box::new(hook));
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Network(e)
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("server reported 401, clearing session");
            self.session.clear();
            if let Some(hook) = &self.on_unauthorized {
                hook();
            }
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .json::<FailureBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(status = %status, "api call succeeded");
        Ok(response)
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<AuthSuccess, ClientError> {
        let response = self
            .send(self.http.post(self.url("/api/auth/register")).json(form))
            .await?;
        let auth: AuthSuccess = response.json().await.map_err(ClientError::Decode)?;
        self.session.store(
            auth.token.clone(),
            auth.user.clone(),
            auth.user.role.clone(),
        );
        Ok(auth)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSuccess, ClientError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .send(self.http.post(self.url("/api/auth/login")).json(&body))
            .await?;
        let auth: AuthSuccess = response.json().await.map_err(ClientError::Decode)?;
        self.session.store(
            auth.token.clone(),
            auth.user.clone(),
            auth.user.role.clone(),
        );
        Ok(auth)
    }

    pub async fn me(&self) -> Result<PublicUser, ClientError> {
        let response = self.send(self.http.get(self.url("/api/auth/me"))).await?;
        let body: MeBody = response.json().await.map_err(ClientError::Decode)?;
        Ok(body.user)
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.send(self.http.get(self.url("/api/health"))).await?;
        response.json().await.map_err(ClientError::Decode)
    }
}
