//! Keycloak master-realm admin session
//!
//! The session is created lazily: the first caller exchanges the master-admin
//! credentials for a token (OAuth2 password grant), later callers reuse it.
//! An expired access token is refreshed with the refresh token, falling back
//! to a new password grant when the refresh is refused.

use crate::reconcile::{transport_message, upstream_message};
use crate::{ReconcileError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Renew this long before the server-side expiry
const EXPIRY_SKEW: Duration = Duration::from_secs(5);

/// Master-admin credentials read from the mounted secret
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub client_id: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn from_response(response: TokenResponse) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_SKEW));
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Authenticated admin session, owned by one bootstrap run.
///
/// Not meant to be shared between concurrent callers; the mutex only lets
/// the retry closure borrow the session without `&mut`.
pub struct AdminSession {
    token_url: String,
    credentials: AdminCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSession")
            .field("token_url", &self.token_url)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl AdminSession {
    /// Session against `{keycloak_base}/realms/{realm}/protocol/openid-connect/token`
    pub fn new(keycloak_base: &str, realm: &str, credentials: AdminCredentials) -> Self {
        let token_url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            keycloak_base.trim_end_matches('/'),
            realm
        );
        Self {
            token_url,
            credentials,
            token: Mutex::new(None),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Whether a token has been fetched and is still cached
    pub async fn is_authenticated(&self) -> bool {
        self.token.lock().await.is_some()
    }

    /// Drop the cached token so the next call authenticates again
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    /// Current access token, fetching or refreshing it as needed
    pub async fn get_or_create(&self, client: &Client) -> Result<String> {
        let mut guard = self.token.lock().await;

        let refresh_token = match guard.as_ref() {
            Some(token) if !token.is_expired() => return Ok(token.access_token.clone()),
            Some(token) => token.refresh_token.clone(),
            None => {
                info!("Fetching initial KC master admin token.");
                None
            }
        };

        if let Some(refresh_token) = refresh_token {
            match self.refresh(client, &refresh_token).await {
                Ok(fresh) => {
                    info!("Refreshed Keycloak master admin token");
                    let access_token = fresh.access_token.clone();
                    *guard = Some(fresh);
                    return Ok(access_token);
                }
                Err(e) => debug!(error = %e, "Token refresh refused, logging in again"),
            }
        }

        let fresh = self.password_grant(client).await?;
        let access_token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access_token)
    }

    async fn password_grant(&self, client: &Client) -> Result<CachedToken> {
        let params = [
            ("grant_type", "password"),
            ("client_id", self.credentials.client_id.as_str()),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        self.request_token(client, &params).await
    }

    async fn refresh(&self, client: &Client, refresh_token: &str) -> Result<CachedToken> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.request_token(client, &params).await
    }

    async fn request_token(&self, client: &Client, params: &[(&str, &str)]) -> Result<CachedToken> {
        let response = client.post(&self.token_url).form(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = transport_message(status, body.len());
            let message = upstream_message(&body).unwrap_or_else(|_| detail.clone());
            return Err(ReconcileError::Auth(format!("{} ({})", message, detail)));
        }

        let token: TokenResponse = response.json().await?;
        Ok(CachedToken::from_response(token))
    }
}
