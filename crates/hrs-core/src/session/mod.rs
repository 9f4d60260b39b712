//! Explicit login session: check with the server on start, tear down on logout.
//!
//! The session owns the API client and the server cookie. Callers pass it
//! (or its `cookie_header`) to whatever needs authentication, such as the
//! upload transport or the `feedback` calls.

mod store;

pub use store::{PersistedSession, SessionStore};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiResponse};

pub const ME_PATH: &str = "/auth/me";
pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const REGISTER_PATH: &str = "/auth/register";

/// Account as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: Option<User>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug)]
pub struct Session {
    client: ApiClient,
    user: Option<User>,
}

impl Session {
    /// Start a session. With a cookie, asks the server who we are; a 401
    /// (or 404 for a deleted user) means anonymous, not an error.
    pub async fn init(client: ApiClient) -> Result<Self> {
        let mut session = Session { client, user: None };
        if session.client.cookie().is_none() {
            return Ok(session);
        }
        let response = session.call_get(ME_PATH).await?;
        match response.status {
            200..=299 => {
                let envelope: UserEnvelope = response.json()?;
                session.user = envelope.user;
                if session.user.is_none() {
                    session.client.set_cookie(None);
                }
            }
            401 | 404 => {
                tracing::debug!(status = response.status, "stored session is no longer valid");
                session.client.set_cookie(None);
            }
            code => anyhow::bail!(
                "session check returned HTTP {}{}",
                code,
                response
                    .error_message()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default()
            ),
        }
        Ok(session)
    }

    /// Log in and keep the session cookie the server sets.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<&User> {
        let request = LoginRequest { username, password };
        let body = serde_json::to_value(&request).context("serialize login")?;
        let response = self.call_post(LOGIN_PATH, body).await?;
        if !response.is_success() {
            return Err(rejection(&response, "login"));
        }
        let envelope: UserEnvelope = response.json()?;
        let user = envelope
            .user
            .ok_or_else(|| anyhow::anyhow!("login response has no user"))?;
        let cookie = response
            .cookie()
            .ok_or_else(|| anyhow::anyhow!("login response set no session cookie"))?;
        tracing::info!(username = %user.username, role = %user.role, "logged in");
        self.client.set_cookie(Some(cookie));
        Ok(&*self.user.insert(user))
    }

    /// Create a regular (non-admin) account. Does not log in.
    pub async fn register(&self, username: &str, password: &str) -> Result<User> {
        if username.trim().is_empty() || password.is_empty() {
            anyhow::bail!("username and password are required");
        }
        let request = LoginRequest { username, password };
        let body = serde_json::to_value(&request).context("serialize registration")?;
        let response = self.call_post(REGISTER_PATH, body).await?;
        if !response.is_success() {
            return Err(rejection(&response, "registration"));
        }
        let envelope: UserEnvelope = response.json()?;
        let user = envelope
            .user
            .ok_or_else(|| anyhow::anyhow!("registration response has no user"))?;
        tracing::info!(username = %user.username, "registered account");
        Ok(user)
    }

    /// End the session. Local state is cleared even if the server call fails.
    pub async fn teardown(&mut self) -> Result<()> {
        if self.client.cookie().is_some() {
            match self.call_post(LOGOUT_PATH, serde_json::json!({})).await {
                Ok(r) if r.is_success() => tracing::info!("logged out"),
                Ok(r) => tracing::warn!(status = r.status, "logout returned non-success"),
                Err(e) => tracing::warn!("logout request failed: {:#}", e),
            }
        }
        self.user = None;
        self.client.set_cookie(None);
        Ok(())
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Value for a `Cookie` request header, when logged in.
    pub fn cookie_header(&self) -> Option<&str> {
        self.client.cookie()
    }

    /// Snapshot for `SessionStore::save`, when logged in.
    pub fn to_persisted(&self) -> Option<PersistedSession> {
        let cookie = self.client.cookie()?;
        Some(PersistedSession {
            cookie: cookie.to_string(),
            username: self.user.as_ref().map(|u| u.username.clone()),
        })
    }

    async fn call_get(&self, path: &'static str) -> Result<ApiResponse> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || client.get(path))
            .await
            .context("api task join")?
    }

    /// POST a JSON body with this session's cookie.
    pub(crate) async fn call_post(
        &self,
        path: &'static str,
        body: serde_json::Value,
    ) -> Result<ApiResponse> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || client.post_json(path, &body))
            .await
            .context("api task join")?
    }
}

/// Error for a non-2xx answer: the server's `{error}` text, else the status.
pub(crate) fn rejection(response: &ApiResponse, action: &str) -> anyhow::Error {
    let message = response
        .error_message()
        .unwrap_or_else(|| format!("{action} failed (HTTP {})", response.status));
    anyhow::anyhow!("{}", message)
}
