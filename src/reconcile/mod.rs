//! Resource reconciliation engine
//!
//! Drives one remote resource toward a declared state with the smallest
//! state-changing call:
//!
//! 1. **Probe** (`present`, probe-capable resources only): `GET`, 404 means
//!    create, 200 means update, anything else is a lookup error.
//! 2. **Create**: `POST` with the non-empty desired fields.
//! 3. **Update**: `PATCH` with the non-empty desired fields minus the key.
//! 4. **Delete** (`absent`): `DELETE`, no probe.
//!
//! The terminal answer is classified by [`decision::decide`].

pub mod decision;
pub mod outcome;

pub use decision::{decide, Verdict};
pub use outcome::Outcome;

use crate::auth::Credentials;
use crate::{ReconcileError, Result};
use reqwest::{header, Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request timeout for the probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout for create/update/delete
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Declared state of a resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    #[default]
    Present,
    Absent,
}

impl std::str::FromStr for TargetState {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "present" => Ok(TargetState::Present),
            "absent" => Ok(TargetState::Absent),
            other => Err(ReconcileError::Config(format!(
                "value of state must be one of: absent, present, got: {}",
                other
            ))),
        }
    }
}

/// State-changing call the engine settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    fn past_tense(self) -> &'static str {
        match self {
            Operation::Create => "created",
            Operation::Update => "updated",
            Operation::Delete => "deleted",
        }
    }
}

/// Resource kinds the engine knows how to report on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Organization,
    Repository,
}

impl ResourceKind {
    /// Whether 409 on create means the desired state is already met.
    ///
    /// Gitea has no repository update endpoint, so an existing repository is
    /// as close to the desired state as this tool can get.
    pub fn conflict_means_exists(self) -> bool {
        matches!(self, ResourceKind::Repository)
    }

    fn short_name(self) -> &'static str {
        match self {
            ResourceKind::Organization => "org",
            ResourceKind::Repository => "repo",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Organization => write!(f, "Organization"),
            ResourceKind::Repository => write!(f, "Repository"),
        }
    }
}

/// URLs needed to probe, create, update and delete one resource instance.
///
/// `probe` and `update` are only set for resources whose API supports both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    pub probe: Option<String>,
    pub create: String,
    pub update: Option<String>,
    pub delete: String,
}

/// A desired-state descriptor the engine can reconcile
pub trait Resource {
    fn kind(&self) -> ResourceKind;

    /// Value of the immutable key field
    fn name(&self) -> &str;

    fn locator(&self, base_url: &str) -> ResourceLocator;

    /// Create body: the key plus every non-empty optional field
    fn create_body(&self) -> Result<Value>;

    /// Update body: every non-empty optional field, never the key.
    /// `None` for kinds the API cannot patch.
    fn update_body(&self) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Error body returned on failures. Keycloak names the field `errorMessage`.
#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(alias = "errorMessage")]
    message: String,
}

/// Human-readable `message` of a JSON error body
pub(crate) fn upstream_message(body: &str) -> std::result::Result<String, serde_json::Error> {
    serde_json::from_str::<ApiMessage>(body).map(|m| m.message)
}

/// One completed HTTP round-trip
#[derive(Debug)]
struct Exchange {
    status: u16,
    transport_message: String,
    body: String,
}

impl Exchange {
    fn payload(&self) -> Option<Value> {
        if self.body.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&self.body) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "Response body is not JSON, dropping it");
                None
            }
        }
    }

    /// Upstream `message` field, if the body is a JSON error document
    fn upstream_message(&self) -> std::result::Result<String, serde_json::Error> {
        upstream_message(&self.body)
    }
}

/// Message format of the HTTP layer for a given status
pub fn transport_message(status: StatusCode, body_len: usize) -> String {
    if status.as_u16() < 400 {
        format!("OK ({} bytes)", body_len)
    } else {
        format!(
            "HTTP Error {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
    }
}

/// Reconciles resources against one Gitea API base URL
pub struct Reconciler {
    client: Client,
    base_url: String,
    authorization: String,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Reconciler {
    /// Create a reconciler with its own HTTP client
    pub fn new(base_url: &str, credentials: &Credentials) -> Result<Self> {
        let client = Client::builder()
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("gitea-reconcile/0.1"),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()?;

        Ok(Self::with_client(client, base_url, credentials))
    }

    /// Create a reconciler around an existing HTTP client
    pub fn with_client(client: Client, base_url: &str, credentials: &Credentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: credentials.authorization_header(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Drive `resource` toward `target`.
    ///
    /// Idempotent successes come back as `Ok` with `changed == false`.
    /// Lookup errors, rejections and transport failures come back as `Err`.
    pub async fn reconcile<R: Resource + ?Sized>(
        &self,
        resource: &R,
        target: TargetState,
    ) -> Result<Outcome> {
        let kind = resource.kind();
        if resource.name().trim().is_empty() {
            return Err(ReconcileError::Config(format!(
                "{} name must not be empty",
                kind
            )));
        }
        let locator = resource.locator(&self.base_url);

        let (operation, exchange) = match target {
            TargetState::Absent => {
                debug!(%kind, name = resource.name(), "Deleting");
                let exchange = self
                    .send(Method::DELETE, &locator.delete, None, WRITE_TIMEOUT)
                    .await?;
                (Operation::Delete, exchange)
            }
            TargetState::Present => {
                let operation = match (&locator.probe, &locator.update) {
                    (Some(probe), Some(_)) => self.probe(resource, probe).await?,
                    _ => Operation::Create,
                };

                let patch = match (operation, &locator.update) {
                    (Operation::Update, Some(update)) => resource
                        .update_body()?
                        .map(|body| (update.as_str(), body)),
                    _ => None,
                };
                let (operation, method, url, body) = match patch {
                    Some((url, body)) => (Operation::Update, Method::PATCH, url, body),
                    None => (
                        Operation::Create,
                        Method::POST,
                        locator.create.as_str(),
                        resource.create_body()?,
                    ),
                };

                debug!(%kind, name = resource.name(), ?operation, %url, "Applying desired state");
                let exchange = self.send(method, url, Some(&body), WRITE_TIMEOUT).await?;
                (operation, exchange)
            }
        };

        self.classify(resource, target, operation, exchange)
    }

    async fn probe<R: Resource + ?Sized>(&self, resource: &R, url: &str) -> Result<Operation> {
        let exchange = self.send(Method::GET, url, None, PROBE_TIMEOUT).await?;

        match exchange.status {
            404 => {
                debug!(kind = %resource.kind(), name = resource.name(), "Not found, will create");
                Ok(Operation::Create)
            }
            200 => {
                debug!(kind = %resource.kind(), name = resource.name(), "Exists, will update");
                Ok(Operation::Update)
            }
            status => Err(ReconcileError::Lookup {
                status,
                message: format!("Unable to find the {}.", resource.kind().short_name()),
                error: exchange.transport_message,
            }),
        }
    }

    fn classify<R: Resource + ?Sized>(
        &self,
        resource: &R,
        target: TargetState,
        operation: Operation,
        exchange: Exchange,
    ) -> Result<Outcome> {
        let kind = resource.kind();
        let name = resource.name();

        match decide(kind, target, operation, exchange.status) {
            Verdict::Applied => {
                let msg = format!("{} {} was {}.", kind, name, operation.past_tense());
                info!(status = exchange.status, "{}", msg);
                Ok(Outcome::changed(msg, exchange.status, exchange.payload()))
            }
            Verdict::AlreadyAbsent => {
                let msg = format!("{} {} removed.", kind, name);
                info!(status = exchange.status, "{}", msg);
                Ok(Outcome::unchanged(msg, exchange.status))
            }
            Verdict::AlreadyExists => {
                let msg = format!("{} {} exists.", kind, name);
                info!(status = exchange.status, "{}", msg);
                Ok(Outcome::unchanged(msg, exchange.status))
            }
            Verdict::Rejected => {
                let message = match exchange.upstream_message() {
                    Ok(message) => message,
                    Err(_) => exchange.transport_message.clone(),
                };
                warn!(
                    %kind,
                    name,
                    status = exchange.status,
                    message = %message,
                    "Request rejected"
                );
                Err(ReconcileError::Rejected {
                    status: exchange.status,
                    message,
                    error: exchange.transport_message,
                })
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<Exchange> {
        let mut request = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, &self.authorization)
            .timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(Exchange {
            status: status.as_u16(),
            transport_message: transport_message(status, body.len()),
            body,
        })
    }
}
