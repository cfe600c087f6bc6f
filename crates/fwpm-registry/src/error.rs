//! Registry error types.

use std::path::PathBuf;

/// One source of a version constraint on a slug, kept for diagnostics.
///
/// `requester` is `(root)` for constraints coming from the request set
/// itself, otherwise the slug (and version) of the dependent plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSource {
    /// Who asked for this constraint.
    pub requester: String,
    /// The constraint text as written by the requester.
    pub constraint: String,
}

impl std::fmt::Display for ConstraintSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' from {}", self.constraint, self.requester)
    }
}

/// Errors that can occur during catalog and resolution operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A version string did not parse.
    #[error("malformed version '{text}': {detail}")]
    InvalidVersion { text: String, detail: String },

    /// A constraint string did not parse.
    #[error("malformed constraint '{text}': {detail}")]
    InvalidConstraint { text: String, detail: String },

    /// A requested or depended-on slug has zero catalog entries.
    #[error("no catalog entries for plugin '{slug}'")]
    MissingSlug { slug: String },

    /// No version satisfies the accumulated constraints on a slug.
    ///
    /// Carries every contributing requester so the caller can show *why*
    /// the intersection is empty, not just that it is.
    #[error("no version of '{slug}' satisfies {}", format_sources(.wanted))]
    UnsatisfiableConstraint {
        slug: String,
        wanted: Vec<ConstraintSource>,
    },

    /// Two manifests were published for the same (slug, version) pair.
    #[error("duplicate catalog entry for '{slug}@{version}'")]
    DuplicateVersion { slug: String, version: String },

    /// Invalid plugin manifest.
    #[error("invalid plugin manifest: {detail}")]
    InvalidManifest { detail: String },

    /// Cache I/O error.
    #[error("cache error at {path}: {detail}")]
    CacheError { path: PathBuf, detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_sources(wanted: &[ConstraintSource]) -> String {
    wanted
        .iter()
        .map(ConstraintSource::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
