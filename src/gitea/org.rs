//! Gitea organizations
//!
//! Organizations support probe and update, so the engine checks
//! `GET /orgs/{name}` first and picks create or update from the answer.

use super::{non_empty, segment};
use crate::reconcile::{Resource, ResourceKind, ResourceLocator};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Desired state of an organization. `username` is the immutable key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// `EditOrgOption` body: the optional fields only
#[derive(Debug, Serialize)]
struct EditOrgOption<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<&'a str>,
}

/// `CreateOrgOption` body: the key plus the optional fields
#[derive(Debug, Serialize)]
struct CreateOrgOption<'a> {
    username: &'a str,
    #[serde(flatten)]
    fields: EditOrgOption<'a>,
}

impl Organization {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    fn edit_option(&self) -> EditOrgOption<'_> {
        EditOrgOption {
            description: non_empty(&self.description),
            full_name: non_empty(&self.full_name),
            location: non_empty(&self.location),
            website: non_empty(&self.website),
        }
    }
}

impl Resource for Organization {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Organization
    }

    fn name(&self) -> &str {
        &self.username
    }

    fn locator(&self, base_url: &str) -> ResourceLocator {
        let item = format!("{}/orgs/{}", base_url, segment(&self.username));
        ResourceLocator {
            probe: Some(item.clone()),
            create: format!("{}/orgs", base_url),
            update: Some(item.clone()),
            delete: item,
        }
    }

    fn create_body(&self) -> Result<Value> {
        let body = CreateOrgOption {
            username: &self.username,
            fields: self.edit_option(),
        };
        Ok(serde_json::to_value(body)?)
    }

    fn update_body(&self) -> Result<Option<Value>> {
        Ok(Some(serde_json::to_value(self.edit_option())?))
    }
}
