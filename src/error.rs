//! Error types for gitea-reconcile
//!
//! One enum covers every way a reconcile or bootstrap run can fail. The
//! variants follow the failure classes operators need to tell apart: bad
//! input, an unexpected probe answer, an upstream rejection, and a transport
//! failure that never produced an HTTP status.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gitea-reconcile operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Missing, incomplete or mutually exclusive inputs. Raised before any request.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The probe answered with something other than 200 or 404
    #[error("{message} ({error})")]
    Lookup {
        status: u16,
        message: String,
        error: String,
    },

    /// Create/update/delete answered >= 400 outside the idempotent cases
    #[error("{message} ({error})")]
    Rejected {
        status: u16,
        message: String,
        error: String,
    },

    /// Connection refused, DNS, timeout: no HTTP status was received
    #[error("Request failed: {0}")]
    Transient(#[from] reqwest::Error),

    /// The identity store refused the admin credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A mounted secret file could not be read
    #[error("Unable to read secret {path}: {source}")]
    Secret {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl ReconcileError {
    /// Upstream HTTP status, when the failure came from an HTTP answer
    pub fn status(&self) -> Option<u16> {
        match self {
            ReconcileError::Lookup { status, .. } | ReconcileError::Rejected { status, .. } => {
                Some(*status)
            }
            ReconcileError::Transient(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Raw transport-level message, kept apart from any parsed upstream message
    pub fn detail(&self) -> String {
        match self {
            ReconcileError::Lookup { error, .. } | ReconcileError::Rejected { error, .. } => {
                error.clone()
            }
            ReconcileError::Transient(e) => format!("Request failed: {}", e),
            other => other.to_string(),
        }
    }

    /// Human-readable message: the upstream `message` when one was parsed
    pub fn message(&self) -> String {
        match self {
            ReconcileError::Lookup { message, .. } | ReconcileError::Rejected { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_keeps_status_and_detail() {
        let err = ReconcileError::Rejected {
            status: 422,
            message: "user already exists".to_string(),
            error: "HTTP Error 422: Unprocessable Entity".to_string(),
        };

        assert_eq!(err.status(), Some(422));
        assert_eq!(err.message(), "user already exists");
        assert_eq!(err.detail(), "HTTP Error 422: Unprocessable Entity");
        assert!(err.to_string().contains("user already exists"));
        assert!(err.to_string().contains("HTTP Error 422"));
    }

    #[test]
    fn test_config_error_has_no_status() {
        let err = ReconcileError::Config("api_token and login_user are mutually exclusive".into());
        assert_eq!(err.status(), None);
        assert!(err.message().starts_with("Configuration error"));
    }
}
