//! Patch error types.

use std::path::PathBuf;

/// Errors that can occur during patch selection and application.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// No artifact matches the firmware identifier.
    ///
    /// Not automatically fatal; the caller decides whether a missing
    /// patch aborts the workflow.
    #[error("no compatible firmware patch for {wanted}")]
    NoCompatiblePatch { wanted: String },

    /// Two versioned artifacts share the same floor version.
    #[error("duplicate patch floor version {version}")]
    DuplicateFloor { version: String },

    /// A patch bundle failed to parse or violates its invariants.
    #[error("invalid patch bundle {path}: {detail}")]
    InvalidBundle { path: PathBuf, detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for patch operations.
pub type Result<T> = std::result::Result<T, PatchError>;
