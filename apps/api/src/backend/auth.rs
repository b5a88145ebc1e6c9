use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::ErrorCategory;
use crate::retry::Retryable;

/// OAuth providers the hosted auth service is set up for.
pub const OAUTH_PROVIDERS: &[&str] = &["google", "github", "linkedin_oidc"];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("session expired or revoked")]
    SessionExpired,

    #[error("unsupported OAuth provider '{0}'")]
    UnsupportedProvider(String),

    #[error("auth request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth service error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::UnsupportedProvider(_) => ErrorCategory::Validation,
            AuthError::Http(_) => ErrorCategory::Network,
            _ => ErrorCategory::Authentication,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::UnsupportedProvider(_) => "UNSUPPORTED_PROVIDER",
            AuthError::Http(_) => "AUTH_UNREACHABLE",
            AuthError::Api { .. } => "AUTH_ERROR",
        }
    }
}

impl Retryable for AuthError {
    fn is_retryable(&self) -> bool {
        match self {
            AuthError::Http(_) => true,
            AuthError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// One auth state change: the event and the session after it, if any.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<AuthSession>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// URL the browser is sent to; the provider redirects back to `redirect_to`.
    fn oauth_authorize_url(&self, provider: &str, redirect_to: &str) -> Result<String, AuthError>;

    /// Exchanges a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default, alias = "error_description", alias = "msg")]
    message: Option<String>,
}

/// Client for a GoTrue-compatible hosted auth REST API.
#[derive(Clone)]
pub struct HostedAuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl HostedAuthClient {
    pub fn new(client: Client, base_url: &str, anon_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }
}

#[async_trait]
impl AuthProvider for HostedAuthClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 400 || status == 401 {
            return Err(AuthError::InvalidCredentials);
        }
        let token: TokenResponse = check_status(response).await?.json().await?;

        info!("Signed in user {}", token.user.id);
        Ok(token.into_session(Utc::now()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token?grant_type=refresh_token"))
            .header("apikey", &self.anon_key)
            .json(&RefreshGrant { refresh_token })
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 400 || status == 401 {
            return Err(AuthError::SessionExpired);
        }
        let token: TokenResponse = check_status(response).await?.json().await?;
        debug!("Refreshed session for {}", token.user.id);
        Ok(token.into_session(Utc::now()))
    }

    fn oauth_authorize_url(&self, provider: &str, redirect_to: &str) -> Result<String, AuthError> {
        if !OAUTH_PROVIDERS.contains(&provider) {
            return Err(AuthError::UnsupportedProvider(provider.to_string()));
        }
        let url = Url::parse_with_params(
            &self.endpoint("authorize"),
            &[("provider", provider), ("redirect_to", redirect_to)],
        )
        .map_err(|e| AuthError::Api {
            status: 0,
            message: format!("invalid auth URL: {e}"),
        })?;
        Ok(url.to_string())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().as_u16() == 401 {
            return Err(AuthError::SessionExpired);
        }
        Ok(check_status(response).await?.json().await?)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-revoked token is as good as signed out.
        if response.status().as_u16() == 401 {
            debug!("Sign-out with a revoked token");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body);
    Err(AuthError::Api {
        status: status.as_u16(),
        message,
    })
}

/// The current session plus its change subscription.
pub struct SessionManager {
    current: RwLock<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            current: RwLock::new(None),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.current.read().ok().and_then(|s| s.clone())
    }

    #[cfg(test)]
    pub fn user_id(&self) -> Option<Uuid> {
        self.current().map(|s| s.user.id)
    }

    pub fn sign_in(&self, session: AuthSession) {
        self.replace(Some(session.clone()));
        self.publish(AuthEventKind::SignedIn, Some(session));
    }

    pub fn refresh(&self, session: AuthSession) {
        self.replace(Some(session.clone()));
        self.publish(AuthEventKind::TokenRefreshed, Some(session));
    }

    /// Clears the session; returns it so the caller can revoke the token.
    pub fn sign_out(&self) -> Option<AuthSession> {
        let previous = self.replace(None);
        if previous.is_some() {
            self.publish(AuthEventKind::SignedOut, None);
        }
        previous
    }

    fn replace(&self, session: Option<AuthSession>) -> Option<AuthSession> {
        match self.current.write() {
            Ok(mut current) => std::mem::replace(&mut *current, session),
            Err(_) => None,
        }
    }

    fn publish(&self, kind: AuthEventKind, session: Option<AuthSession>) {
        // No subscribers is fine.
        let _ = self.events.send(AuthEvent { kind, session });
    }
}
