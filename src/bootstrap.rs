//! VCS account bootstrap
//!
//! Makes sure the VCS account exists in Keycloak during cluster bring-up.
//! Keycloak may not have finished setting up its realm yet, so every
//! failed attempt is logged and retried after a fixed sleep, forever. The
//! VCS account secret is read on every attempt, since its volume may be
//! mounted late. The master admin secret is read once and a failure there
//! is fatal.

use crate::keycloak::{
    self, read_account_secret, read_admin_secrets, AdminSession, KeycloakAdmin, UserStatus,
};
use crate::retry::{with_retry, RetryConfig};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything one bootstrap run needs
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub keycloak_base: String,
    pub realm: String,
    pub admin_secret_dir: PathBuf,
    pub account_secret_dir: PathBuf,
    pub retry: RetryConfig,
    pub verify_tls: bool,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            keycloak_base: keycloak::DEFAULT_KEYCLOAK_BASE.to_string(),
            realm: keycloak::DEFAULT_USER_REALM.to_string(),
            admin_secret_dir: PathBuf::from(keycloak::secrets::DEFAULT_ADMIN_SECRET_DIR),
            account_secret_dir: PathBuf::from(keycloak::secrets::DEFAULT_VCS_SECRET_DIR),
            retry: RetryConfig::default(),
            verify_tls: false,
        }
    }
}

/// Ensure the account stored under `account_secret_dir` exists, retrying
/// every failure per `retry`. A missing secret counts as a failed attempt.
///
/// `session` is authenticated on first use and reused across attempts.
pub async fn ensure_account_with_retry(
    admin: &KeycloakAdmin,
    account_secret_dir: &Path,
    session: &AdminSession,
    retry: &RetryConfig,
) -> Result<UserStatus> {
    with_retry(retry, "setup of gitea default user in keycloak", || async move {
        let account = read_account_secret(account_secret_dir)?;
        info!("Creating gitea users..");
        admin.ensure_user(session, &account).await
    })
    .await
}

/// Load the admin secret, then run the account bootstrap until it succeeds
pub async fn run(settings: &BootstrapSettings) -> Result<UserStatus> {
    // Fatal: the admin secret is mounted with the pod, unlike the VCS secret.
    let admin_credentials = read_admin_secrets(&settings.admin_secret_dir)?;

    let client = keycloak::build_client(settings.verify_tls)?;
    let admin = KeycloakAdmin::new(client, &settings.keycloak_base, settings.realm.clone());
    let session = AdminSession::new(
        &settings.keycloak_base,
        keycloak::MASTER_REALM,
        admin_credentials,
    );

    let status = ensure_account_with_retry(
        &admin,
        &settings.account_secret_dir,
        &session,
        &settings.retry,
    )
    .await?;
    info!("gitea user creation complete");
    Ok(status)
}
