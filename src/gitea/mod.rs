//! Gitea resource kinds
//!
//! Desired-state descriptors for the Gitea v1 REST API. Each one implements
//! [`Resource`](crate::reconcile::Resource) so the shared engine can probe,
//! create, update or delete it.

pub mod org;
pub mod repo;

pub use org::Organization;
pub use repo::{RepoOwner, Repository};

/// Optional field value, or `None` when unset or empty
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Percent-encode one URL path segment
fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}
