//! Keycloak admin API
//!
//! Just enough of the admin REST API to make sure the VCS account exists in
//! the platform realm: an admin session against the master realm, and an
//! idempotent user create where 409 means the user is already there.

pub mod secrets;
pub mod session;

pub use secrets::{read_account_secret, read_admin_secrets, AccountSecret};
pub use session::{AdminCredentials, AdminSession};

use crate::reconcile::{transport_message, upstream_message};
use crate::{ReconcileError, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// In-cluster Keycloak base URL, overridden with `KEYCLOAK_BASE`
pub const DEFAULT_KEYCLOAK_BASE: &str = "https://keycloak.services:8080/keycloak";

/// Realm holding the admin account used for bootstrap
pub const MASTER_REALM: &str = "master";

/// Realm the VCS account is created in
pub const DEFAULT_USER_REALM: &str = "shasta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of an idempotent user create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Created,
    AlreadyExists,
}

#[derive(Debug, Serialize)]
struct CredentialRepresentation<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct UserRepresentation<'a> {
    username: &'a str,
    enabled: bool,
    credentials: [CredentialRepresentation<'a>; 1],
}

/// Build the HTTP client used for Keycloak calls
///
/// The in-cluster endpoint serves a self-signed certificate, so verification
/// is off unless `verify_tls` is set.
pub fn build_client(verify_tls: bool) -> Result<Client> {
    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
    if !verify_tls {
        builder = builder.danger_accept_invalid_certs(true);
    }
    Ok(builder.build()?)
}

/// Admin API client for one Keycloak deployment and target realm
#[derive(Debug, Clone)]
pub struct KeycloakAdmin {
    client: Client,
    base_url: String,
    realm: String,
}

impl KeycloakAdmin {
    pub fn new(client: Client, base_url: &str, realm: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            realm: realm.into(),
        }
    }

    /// `{base}/admin/realms/{realm}/users`
    pub fn users_url(&self) -> String {
        format!(
            "{}/admin/realms/{}/users",
            self.base_url,
            urlencoding::encode(&self.realm)
        )
    }

    /// Create `account` in the target realm, treating 409 as success
    pub async fn ensure_user(
        &self,
        session: &AdminSession,
        account: &AccountSecret,
    ) -> Result<UserStatus> {
        let token = session.get_or_create(&self.client).await?;

        let body = UserRepresentation {
            username: &account.username,
            enabled: true,
            credentials: [CredentialRepresentation {
                kind: "password",
                value: &account.password,
            }],
        };

        let response = self
            .client
            .post(self.users_url())
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::CONFLICT {
            info!("User {:?} already exists", account.username);
            return Ok(UserStatus::AlreadyExists);
        }

        if status.as_u16() >= 400 {
            if status == StatusCode::UNAUTHORIZED {
                // Token revoked or realm restarted; log in again next time.
                session.invalidate().await;
            }
            let text = response.text().await.unwrap_or_default();
            let error = transport_message(status, text.len());
            let message = upstream_message(&text).unwrap_or_else(|_| error.clone());
            return Err(ReconcileError::Rejected {
                status: status.as_u16(),
                message,
                error,
            });
        }

        info!("Created user {:?}", account.username);
        Ok(UserStatus::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_PATH: &str = "/keycloak/realms/master/protocol/openid-connect/token";
    const USERS_PATH: &str = "/keycloak/admin/realms/shasta/users";

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "admin-token",
                "expires_in": 60,
            })))
            .mount(server)
            .await;
    }

    fn fixtures(server: &MockServer) -> (KeycloakAdmin, AdminSession, AccountSecret) {
        let base = format!("{}/keycloak", server.uri());
        let admin = KeycloakAdmin::new(Client::new(), &base, DEFAULT_USER_REALM);
        let session = AdminSession::new(
            &base,
            MASTER_REALM,
            AdminCredentials {
                client_id: "admin-cli".to_string(),
                username: "admin".to_string(),
                password: "admin-pass".to_string(),
            },
        );
        let account = AccountSecret {
            username: "crayvcs".to_string(),
            password: "vcs-pass".to_string(),
        };
        (admin, session, account)
    }

    #[tokio::test]
    async fn test_create_user() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path(USERS_PATH))
            .and(header("Authorization", "Bearer admin-token"))
            .and(body_json(json!({
                "username": "crayvcs",
                "enabled": true,
                "credentials": [{"type": "password", "value": "vcs-pass"}],
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let (admin, session, account) = fixtures(&server);
        let status = admin.ensure_user(&session, &account).await.unwrap();
        assert_eq!(status, UserStatus::Created);
    }

    #[tokio::test]
    async fn test_existing_user_is_success() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path(USERS_PATH))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"errorMessage": "User exists with same username"})),
            )
            .mount(&server)
            .await;

        let (admin, session, account) = fixtures(&server);
        let status = admin.ensure_user(&session, &account).await.unwrap();
        assert_eq!(status, UserStatus::AlreadyExists);
    }

    #[tokio::test]
    async fn test_realm_not_ready_is_rejected() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path(USERS_PATH))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "Realm not found."})),
            )
            .mount(&server)
            .await;

        let (admin, session, account) = fixtures(&server);
        let err = admin.ensure_user(&session, &account).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.detail(), "HTTP Error 404: Not Found");
    }

    #[tokio::test]
    async fn test_unauthorized_drops_cached_token() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (admin, session, account) = fixtures(&server);
        assert!(admin.ensure_user(&session, &account).await.is_err());
        assert!(!session.is_authenticated().await);
    }

    #[test]
    fn test_users_url() {
        let admin = KeycloakAdmin::new(Client::new(), "https://kc/keycloak/", "shasta");
        assert_eq!(admin.users_url(), "https://kc/keycloak/admin/realms/shasta/users");
    }
}
