//! gitea-reconcile - declarative Gitea and Keycloak bootstrap tooling
//!
//! Drives Gitea organizations and repositories toward a declared state
//! (`present` with attributes, or `absent`), and makes sure the VCS account
//! exists in Keycloak while the cluster is coming up.
//!
//! # Architecture
//!
//! - **auth**: Token / basic credential resolution for Gitea
//! - **reconcile**: Probe/create/update/delete engine and outcome classification
//! - **gitea**: Organization and repository resource kinds
//! - **keycloak**: Admin session, user creation, mounted secrets
//! - **bootstrap**: Retry-until-ready account bootstrap
//! - **config**: YAML reconcile files and validation

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gitea;
pub mod keycloak;
pub mod logging;
pub mod reconcile;
pub mod retry;

// Re-exports
pub use error::{ReconcileError, Result};
pub use reconcile::{Outcome, Reconciler, TargetState};
