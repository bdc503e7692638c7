//! Invocation result reported back to the caller

use crate::ReconcileError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one reconcile invocation.
///
/// Serialized as the `{changed, msg, json, error}` object callers consume,
/// plus the final HTTP status and a `failed` flag on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub changed: bool,
    pub msg: String,
    /// Parsed response body; an empty object when the server sent none
    #[serde(default = "empty_object")]
    pub json: Value,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl Outcome {
    pub fn changed(msg: impl Into<String>, status: u16, payload: Option<Value>) -> Self {
        Self {
            changed: true,
            msg: msg.into(),
            json: payload.unwrap_or_else(empty_object),
            error: String::new(),
            status: Some(status),
            failed: false,
        }
    }

    pub fn unchanged(msg: impl Into<String>, status: u16) -> Self {
        Self {
            changed: false,
            msg: msg.into(),
            json: empty_object(),
            error: String::new(),
            status: Some(status),
            failed: false,
        }
    }

    /// Failure report. Never carries the raw upstream body.
    pub fn failure(err: &ReconcileError) -> Self {
        Self {
            changed: false,
            msg: err.message(),
            json: empty_object(),
            error: err.detail(),
            status: err.status(),
            failed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_outcome_serialization() {
        let outcome = Outcome::changed(
            "Organization my_org was created.",
            201,
            Some(json!({"id": 3, "username": "my_org"})),
        );
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["changed"], json!(true));
        assert_eq!(value["msg"], json!("Organization my_org was created."));
        assert_eq!(value["json"]["username"], json!("my_org"));
        assert_eq!(value["error"], json!(""));
        assert!(value.get("failed").is_none());
    }

    #[test]
    fn test_unchanged_outcome_has_empty_payload() {
        let outcome = Outcome::unchanged("Repository my_repo exists.", 409);
        assert!(!outcome.changed);
        assert_eq!(outcome.json, json!({}));
        assert_eq!(outcome.status, Some(409));
    }

    #[test]
    fn test_failure_keeps_status_and_message() {
        let err = ReconcileError::Rejected {
            status: 422,
            message: "name is invalid".to_string(),
            error: "HTTP Error 422: Unprocessable Entity".to_string(),
        };
        let outcome = Outcome::failure(&err);

        assert!(outcome.failed);
        assert!(!outcome.changed);
        assert_eq!(outcome.msg, "name is invalid");
        assert_eq!(outcome.error, "HTTP Error 422: Unprocessable Entity");
        assert_eq!(outcome.status, Some(422));

        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("body").is_none());
        assert_eq!(value["failed"], json!(true));
    }
}
