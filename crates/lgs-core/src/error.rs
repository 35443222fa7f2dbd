//! Core error taxonomy.
//!
//! Filesystem, registry and document errors are returned to the caller and
//! never swallowed here. Process crashes are not errors; they surface as
//! status transitions on the event bus.

use std::path::PathBuf;
use thiserror::Error;

use crate::documents::UpgradeError;
use crate::template::TemplateError;

/// Core error type for semantic domain errors.
///
/// Adapters (CLI, HTTP transport) map this to their own error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A job, directory or link destination with the same identity already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The requested job, file or document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is not valid for the job's current status.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A filesystem invariant would be violated (e.g. a link outside shared storage).
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// The settings document cannot be brought to the supported version.
    #[error(transparent)]
    ConfigVersion(#[from] UpgradeError),

    /// The startup command could not be rendered.
    #[error(transparent)]
    CommandTemplate(#[from] TemplateError),

    /// A settings field was unknown, read-only or given a value of the wrong kind.
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// A job type's `init` or `setup` hook failed.
    #[error("Job hook failed for {job}: {reason}")]
    Hook { job: String, reason: String },

    /// Filesystem or process I/O failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for an [`CoreError::InvalidField`].
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for the `AlreadyExists` variant.
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
