//! Reconcile file handling
//!
//! A YAML file listing the organizations and repositories one Gitea
//! instance should (or should not) have, plus how to reach it.

use crate::auth::Credentials;
use crate::gitea::{Organization, RepoOwner, Repository};
use crate::reconcile::TargetState;
use crate::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// How to reach and authenticate against Gitea
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the Gitea API, e.g. `https://vcs.local/api/v1`
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_password: Option<String>,
}

impl ConnectionConfig {
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::resolve(
            self.api_token.as_deref(),
            self.login_user.as_deref(),
            self.login_password.as_deref(),
        )
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("login_user", &self.login_user)
            .field("login_password", &self.login_password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// One organization entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgEntry {
    #[serde(flatten)]
    pub organization: Organization,

    #[serde(default)]
    pub state: TargetState,
}

/// One repository entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub auto_init: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitignores: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    #[serde(default)]
    pub state: TargetState,
}

impl RepoEntry {
    /// Build the desired-state descriptor, resolving the owner
    pub fn to_repository(&self) -> Result<Repository> {
        let owner = RepoOwner::resolve(self.org.as_deref(), self.user.as_deref())?;
        Ok(Repository {
            name: self.name.clone(),
            owner,
            description: self.description.clone(),
            auto_init: self.auto_init,
            gitignores: self.gitignores.clone(),
            license: self.license.clone(),
            private: self.private,
            readme: self.readme.clone(),
        })
    }
}

/// Complete reconcile file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileFile {
    pub gitea: ConnectionConfig,

    #[serde(default)]
    pub organizations: Vec<OrgEntry>,

    #[serde(default)]
    pub repositories: Vec<RepoEntry>,
}

impl ReconcileFile {
    /// Load a reconcile file from `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ReconcileError::Config(format!(
                "Reconcile file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading reconcile file");

        let content = fs::read_to_string(path)?;
        let file: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            organizations = file.organizations.len(),
            repositories = file.repositories.len(),
            "Reconcile file loaded"
        );

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
gitea:
  url: https://vcs.local/api/v1
  api_token: d507e44cdbfe1c48b80000afc12256ce601f3648
organizations:
  - username: my_org
    full_name: My Org
  - username: old_org
    state: absent
repositories:
  - name: config-management
    org: my_org
    private: true
  - name: scratch
    user: admin_user
    state: absent
"#;

    #[test]
    fn test_load_reconcile_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), SAMPLE).unwrap();

        let loaded = ReconcileFile::load(file.path()).unwrap();
        assert_eq!(loaded.gitea.url, "https://vcs.local/api/v1");
        assert_eq!(loaded.organizations.len(), 2);
        assert_eq!(loaded.organizations[0].organization.username, "my_org");
        assert_eq!(loaded.organizations[0].state, TargetState::Present);
        assert_eq!(loaded.organizations[1].state, TargetState::Absent);

        let repo = loaded.repositories[0].to_repository().unwrap();
        assert_eq!(repo.owner, RepoOwner::Org("my_org".to_string()));
        assert!(repo.private);
        assert_eq!(loaded.repositories[1].state, TargetState::Absent);
    }

    #[test]
    fn test_missing_file() {
        let err = ReconcileFile::load("/nonexistent/reconcile.yaml").unwrap_err();
        assert!(err.to_string().contains("Reconcile file not found"));
    }

    #[test]
    fn test_connection_credentials() {
        let conn = ConnectionConfig {
            url: "https://vcs.local/api/v1".to_string(),
            login_user: Some("admin".to_string()),
            login_password: Some("pw".to_string()),
            ..Default::default()
        };
        assert!(matches!(conn.credentials().unwrap(), Credentials::Basic { .. }));
        assert!(!format!("{:?}", conn).contains("\"pw\""));
    }
}
