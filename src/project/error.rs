//! Project store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for project store operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Errors that can occur while reading or writing the project stores.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// No project descriptor was found at or above the given path.
    #[error("Current working directory is not a Cova-based project: {0}")]
    NotAProject(PathBuf),

    /// Required store file is missing.
    #[error("Missing project file: {0}")]
    MissingFile(PathBuf),

    /// The project descriptor is not well-formed XML or lacks a `<widget>` root.
    #[error("Malformed project descriptor: {0}")]
    Descriptor(String),

    /// The package manifest (or another JSON store) failed to parse or serialize.
    #[error("Malformed package manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// XML parse or render error.
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
