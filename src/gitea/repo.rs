//! Gitea repositories
//!
//! The Gitea repository API has no update endpoint
//! (<https://github.com/go-gitea/gitea/issues/5960>), so `present` is a blind
//! create and a 409 answer means the repository already exists.

use super::{non_empty, segment};
use crate::reconcile::{Resource, ResourceKind, ResourceLocator};
use crate::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who owns (or will own) a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoOwner {
    /// Created through `POST /org/{org}/repos`
    Org(String),
    /// Created through `POST /user/repos` as the authenticated user
    User(String),
}

impl RepoOwner {
    /// Pick the owner from the mutually exclusive `org`/`user` inputs
    pub fn resolve(org: Option<&str>, user: Option<&str>) -> Result<Self> {
        let org = org.filter(|o| !o.is_empty());
        let user = user.filter(|u| !u.is_empty());

        match (org, user) {
            (Some(_), Some(_)) => Err(ReconcileError::Config(
                "parameters are mutually exclusive: org|user".to_string(),
            )),
            (Some(org), None) => Ok(RepoOwner::Org(org.to_string())),
            (None, Some(user)) => Ok(RepoOwner::User(user.to_string())),
            (None, None) => Err(ReconcileError::Config(
                "one of the following is required: org, user".to_string(),
            )),
        }
    }

    pub fn login(&self) -> &str {
        match self {
            RepoOwner::Org(name) | RepoOwner::User(name) => name,
        }
    }
}

/// Desired state of a repository. `name` is the immutable key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub owner: RepoOwner,
    pub description: Option<String>,
    pub auto_init: bool,
    pub gitignores: Option<String>,
    pub license: Option<String>,
    pub private: bool,
    pub readme: Option<String>,
}

/// `CreateRepoOption` body
#[derive(Debug, Serialize)]
struct CreateRepoOption<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    auto_init: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gitignores: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    readme: Option<&'a str>,
}

impl Repository {
    pub fn new(name: impl Into<String>, owner: RepoOwner) -> Self {
        Self {
            name: name.into(),
            owner,
            description: None,
            auto_init: false,
            gitignores: None,
            license: None,
            private: false,
            readme: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_auto_init(mut self, auto_init: bool) -> Self {
        self.auto_init = auto_init;
        self
    }

    pub fn with_gitignores(mut self, gitignores: impl Into<String>) -> Self {
        self.gitignores = Some(gitignores.into());
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn with_readme(mut self, readme: impl Into<String>) -> Self {
        self.readme = Some(readme.into());
        self
    }

    fn create_option(&self) -> CreateRepoOption<'_> {
        CreateRepoOption {
            name: &self.name,
            auto_init: self.auto_init,
            description: non_empty(&self.description),
            gitignores: non_empty(&self.gitignores),
            license: non_empty(&self.license),
            private: self.private,
            readme: non_empty(&self.readme),
        }
    }
}

impl Resource for Repository {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Repository
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn locator(&self, base_url: &str) -> ResourceLocator {
        let create = match &self.owner {
            RepoOwner::Org(org) => format!("{}/org/{}/repos", base_url, segment(org)),
            RepoOwner::User(_) => format!("{}/user/repos", base_url),
        };
        ResourceLocator {
            probe: None,
            create,
            update: None,
            delete: format!(
                "{}/repos/{}/{}",
                base_url,
                segment(self.owner.login()),
                segment(&self.name)
            ),
        }
    }

    fn create_body(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.create_option())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn org_repo() -> Repository {
        Repository::new("my_repo", RepoOwner::Org("my_org".to_string()))
    }

    #[test]
    fn test_minimal_create_body_has_only_key() {
        assert_eq!(org_repo().create_body().unwrap(), json!({"name": "my_repo"}));
    }

    #[test]
    fn test_false_flags_are_omitted() {
        let body = org_repo().with_private(true).with_readme("").create_body().unwrap();
        assert_eq!(body, json!({"name": "my_repo", "private": true}));
    }

    #[test]
    fn test_full_create_body() {
        let repo = org_repo()
            .with_description("Config repo")
            .with_auto_init(true)
            .with_gitignores("Go")
            .with_license("MIT")
            .with_readme("Default");
        assert_eq!(
            repo.create_body().unwrap(),
            json!({
                "name": "my_repo",
                "auto_init": true,
                "description": "Config repo",
                "gitignores": "Go",
                "license": "MIT",
                "readme": "Default",
            })
        );
    }

    #[test]
    fn test_repositories_are_never_patched() {
        assert_eq!(org_repo().update_body().unwrap(), None);
    }

    #[test]
    fn test_org_locator() {
        let locator = org_repo().locator("https://gitea.example.com/api/v1");
        assert_eq!(locator.probe, None);
        assert_eq!(locator.update, None);
        assert_eq!(locator.create, "https://gitea.example.com/api/v1/org/my_org/repos");
        assert_eq!(
            locator.delete,
            "https://gitea.example.com/api/v1/repos/my_org/my_repo"
        );
    }

    #[test]
    fn test_user_locator() {
        let repo = Repository::new("my_repo", RepoOwner::User("admin_user".to_string()));
        let locator = repo.locator("https://gitea.example.com/api/v1");
        assert_eq!(locator.create, "https://gitea.example.com/api/v1/user/repos");
        assert_eq!(
            locator.delete,
            "https://gitea.example.com/api/v1/repos/admin_user/my_repo"
        );
    }

    #[test]
    fn test_owner_resolution() {
        assert_eq!(
            RepoOwner::resolve(Some("my_org"), None).unwrap(),
            RepoOwner::Org("my_org".to_string())
        );
        assert_eq!(
            RepoOwner::resolve(Some(""), Some("admin")).unwrap(),
            RepoOwner::User("admin".to_string())
        );
        assert!(RepoOwner::resolve(Some("my_org"), Some("admin")).is_err());
        assert!(RepoOwner::resolve(None, None).is_err());
    }
}
