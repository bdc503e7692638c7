//! Mounted bootstrap secrets
//!
//! The Keycloak master-admin credentials and the VCS account credentials
//! come from files mounted into the pod. Reading them is never retried: a
//! missing file is a deployment problem, not a startup race.

use super::session::AdminCredentials;
use crate::{ReconcileError, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default mount point of the Keycloak master-admin secret
pub const DEFAULT_ADMIN_SECRET_DIR: &str = "/mnt/keycloak-master-admin-auth-vol";

/// Default mount point of the VCS account secret
pub const DEFAULT_VCS_SECRET_DIR: &str = "/mnt/vcs-user-credentials";

/// Username and password of the account to ensure in the identity store
#[derive(Clone, PartialEq, Eq)]
pub struct AccountSecret {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AccountSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSecret")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

fn read_secret(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    let raw = fs::read_to_string(&path).map_err(|source| ReconcileError::Secret {
        path: path.clone(),
        source,
    })?;
    Ok(raw.trim_end_matches(['\r', '\n']).to_string())
}

/// Read `client-id`, `user` and `password` from the master-admin secret
pub fn read_admin_secrets(dir: impl AsRef<Path>) -> Result<AdminCredentials> {
    let dir = dir.as_ref();
    info!(dir = %dir.display(), "Loading keycloak secrets.");

    Ok(AdminCredentials {
        client_id: read_secret(dir, "client-id")?,
        username: read_secret(dir, "user")?,
        password: read_secret(dir, "password")?,
    })
}

/// Read `vcs_username` and `vcs_password` from the VCS account secret
pub fn read_account_secret(dir: impl AsRef<Path>) -> Result<AccountSecret> {
    let dir = dir.as_ref();
    let load = || -> Result<AccountSecret> {
        Ok(AccountSecret {
            username: read_secret(dir, "vcs_username")?,
            password: read_secret(dir, "vcs_password")?,
        })
    };

    load().inspect_err(|_| warn!(dir = %dir.display(), "Expected vcs user secret, but not found"))
}
