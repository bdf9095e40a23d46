//! Error types for asset reconciliation

use std::path::PathBuf;

use thiserror::Error;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Reconciliation errors
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Target already exists: {target} (skipping {source_name})")]
    TargetExists { source_name: String, target: String },

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Document walk error: {0}")]
    DocumentWalk(#[from] ignore::Error),
}
