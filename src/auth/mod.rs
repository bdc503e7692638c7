//! Credential resolution for the Gitea API
//!
//! Gitea accepts either an API token or a username/password pair. Exactly one
//! of the two must be supplied; both are checked here, before any request is
//! built, and turned into a single `Authorization` header value.

use crate::{ReconcileError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

/// Resolved Gitea credentials
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: token <token>`
    Token(String),

    /// `Authorization: Basic base64(username:password)`
    Basic { username: String, password: String },
}

impl Credentials {
    /// Select the credential variant from the raw inputs.
    ///
    /// Empty strings count as not supplied. Fails with a configuration error
    /// when both schemes are given, when neither is, or when the
    /// username/password pair is incomplete.
    pub fn resolve(
        api_token: Option<&str>,
        login_user: Option<&str>,
        login_password: Option<&str>,
    ) -> Result<Self> {
        let token = non_empty(api_token);
        let user = non_empty(login_user);
        let password = non_empty(login_password);

        match (token, user, password) {
            (Some(_), Some(_), _) => Err(ReconcileError::Config(
                "parameters are mutually exclusive: api_token|login_user".to_string(),
            )),
            (Some(_), _, Some(_)) => Err(ReconcileError::Config(
                "parameters are mutually exclusive: api_token|login_password".to_string(),
            )),
            (Some(token), None, None) => Ok(Credentials::Token(token.to_string())),
            (None, Some(user), Some(password)) => Ok(Credentials::Basic {
                username: user.to_string(),
                password: password.to_string(),
            }),
            (None, Some(_), None) | (None, None, Some(_)) => Err(ReconcileError::Config(
                "parameters are required together: login_user, login_password".to_string(),
            )),
            (None, None, None) => Err(ReconcileError::Config(
                "one of the following is required: api_token, login_user".to_string(),
            )),
        }
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        match self {
            Credentials::Token(token) => format!("token {}", token),
            Credentials::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
            }
        }
    }
}

// Never print secrets.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_header() {
        let creds = Credentials::resolve(Some("d507e44cdbfe"), None, None).unwrap();
        assert_eq!(creds.authorization_header(), "token d507e44cdbfe");
    }

    #[test]
    fn test_basic_header() {
        // admin:secret
        let creds = Credentials::resolve(None, Some("admin"), Some("secret")).unwrap();
        assert_eq!(creds.authorization_header(), "Basic YWRtaW46c2VjcmV0");
    }

    #[test]
    fn test_token_and_user_are_exclusive() {
        let err = Credentials::resolve(Some("tok"), Some("admin"), Some("secret")).unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));

        let err = Credentials::resolve(Some("tok"), None, Some("secret")).unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));
    }

    #[test]
    fn test_missing_credentials() {
        let err = Credentials::resolve(None, None, None).unwrap_err();
        assert!(err.to_string().contains("one of the following is required"));

        // Empty strings are treated as absent
        let err = Credentials::resolve(Some(""), Some(""), None).unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));
    }

    #[test]
    fn test_incomplete_basic_pair() {
        let err = Credentials::resolve(None, Some("admin"), None).unwrap_err();
        assert!(err.to_string().contains("required together"));

        let err = Credentials::resolve(None, None, Some("secret")).unwrap_err();
        assert!(err.to_string().contains("required together"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::resolve(None, Some("admin"), Some("hunter2")).unwrap();
        let printed = format!("{:?}", creds);
        assert!(printed.contains("admin"));
        assert!(!printed.contains("hunter2"));
    }
}
