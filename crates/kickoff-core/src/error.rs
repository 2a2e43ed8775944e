//! Error types for the scaffolding pipeline.
//!
//! Recoverable conditions get their own variants so the CLI can decide how to
//! present them; anything unexpected flows through `Other` via anyhow.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for kickoff operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Both transport tiers failed while fetching the registry or a template
    /// configuration.
    #[error("template registry unavailable: {reason}")]
    RegistryUnavailable { reason: String },

    /// The requested template key does not exist in the catalog or the
    /// remote repository.
    #[error("template '{name}' not found")]
    TemplateNotFound { name: String },

    /// A remote resource answered 404.
    #[error("remote resource not found: {path}")]
    NotFound { path: String },

    /// A network or API failure mid-operation.
    #[error("transfer failed for '{path}': {reason}")]
    Transport { path: String, reason: String },

    /// Template evaluation failed on a specific file. Files rendered before
    /// this one are not reverted.
    #[error("failed to render {path}")]
    Render {
        path: PathBuf,
        #[source]
        source: handlebars::RenderError,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for kickoff operations.
pub type Result<T> = std::result::Result<T, Error>;
