//! Configuration
//!
//! Loads the YAML reconcile file consumed by `gitea-reconcile apply`:
//! - The Gitea connection (base URL plus token or basic credentials)
//! - Organizations and repositories with their desired state
//!
//! Single-resource runs (`org`, `repo`) take the same settings from CLI
//! flags and environment variables instead.

mod reconcile_file;
pub mod validation;

pub use reconcile_file::{ConnectionConfig, OrgEntry, ReconcileFile, RepoEntry};
pub use validation::{validate_file, validate_file_result, ValidationError};
