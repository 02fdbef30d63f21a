//! Error types
//!
//! Two kinds of failure exist: validation errors, returned before anything
//! is declared, and provisioning errors, which end the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Missing required service argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing project argument")]
    MissingProject,

    #[error("missing region argument")]
    MissingRegion,

    #[error("missing path argument")]
    MissingPath,
}

/// Failure while rendering the API document or declaring a resource.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Template file missing or unreadable.
    #[error("failed to read template {}: {source}", .path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template does not parse.
    #[error("failed to parse template {}: {reason}", .path.display())]
    TemplateParse { path: PathBuf, reason: String },

    /// Template references a parameter that does not exist.
    #[error("failed to render template {}: {reason}", .path.display())]
    TemplateRender { path: PathBuf, reason: String },

    /// The engine rejected a declaration.
    #[error("failed to declare {kind} '{name}': {reason}")]
    Declaration {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// Parent handle was never registered with the engine.
    #[error("unknown parent {0}")]
    UnknownParent(String),

    /// A declaration consumes an output of a resource not declared yet.
    #[error("'{name}' depends on undeclared resource {urn}")]
    UnknownDependency { name: String, urn: String },

    /// Two declarations share a type and logical name.
    #[error("resource {0} declared twice")]
    DuplicateResource(String),

    /// File archive source is not a directory.
    #[error("archive source {} is not a directory", .0.display())]
    MissingArchive(PathBuf),

    /// The engine did not report an output field.
    #[error("resource '{name}' has no output '{field}'")]
    MissingOutput { name: String, field: String },

    /// Stack output could not be recorded.
    #[error("failed to export '{name}': {reason}")]
    Export { name: String, reason: String },
}

/// Error returned by a topology build.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
}

impl Error {
    /// Validation errors leave no trace in the engine and may be corrected
    /// and retried by the caller. Provisioning errors end the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
