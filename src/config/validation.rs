//! Reconcile file validation
//!
//! Checks a reconcile file before any request is made:
//! - Gitea URL is set and looks like HTTP(S)
//! - Exactly one credential scheme is configured
//! - Every entry has its key field
//! - Every repository has exactly one owner

use super::reconcile_file::ReconcileFile;
use crate::gitea::RepoOwner;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub entry: Option<String>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entry: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref entry) = self.entry {
            write!(f, "[{}] {}: {}", entry, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a reconcile file, collecting every problem
pub fn validate_file(file: &ReconcileFile) -> ValidationResult {
    let mut errors = Vec::new();

    let url = &file.gitea.url;
    if url.is_empty() {
        errors.push(ValidationError::new("gitea.url", "Gitea URL cannot be empty"));
    } else if !url.starts_with("http://") && !url.starts_with("https://") {
        errors.push(ValidationError::new(
            "gitea.url",
            format!("Invalid Gitea URL: {}", url),
        ));
    }

    if let Err(e) = file.gitea.credentials() {
        errors.push(ValidationError::new("gitea", e.to_string()));
    }

    for (index, entry) in file.organizations.iter().enumerate() {
        if entry.organization.username.is_empty() {
            errors.push(
                ValidationError::new("username", "Organization username cannot be empty")
                    .with_entry(format!("organizations[{}]", index)),
            );
        }
    }

    for (index, entry) in file.repositories.iter().enumerate() {
        let label = if entry.name.is_empty() {
            format!("repositories[{}]", index)
        } else {
            entry.name.clone()
        };

        if entry.name.is_empty() {
            errors.push(
                ValidationError::new("name", "Repository name cannot be empty")
                    .with_entry(&label),
            );
        }

        if let Err(e) = RepoOwner::resolve(entry.org.as_deref(), entry.user.as_deref()) {
            errors.push(ValidationError::new("org/user", e.to_string()).with_entry(&label));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and fold the errors into one configuration error
pub fn validate_file_result(file: &ReconcileFile) -> crate::Result<()> {
    validate_file(file).map_err(|errors| {
        let lines: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
        crate::ReconcileError::Config(format!(
            "Reconcile file is invalid:\n{}",
            lines.join("\n")
        ))
    })
}
