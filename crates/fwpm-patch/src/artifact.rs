//! Patch artifact decoding and the on-disk patch set.
//!
//! Shipped patches live in one directory and encode their addressing in
//! the file name: `firmware-patch-v2.6.13.toml` is valid for firmware
//! 2.6.13 and newer (a version floor), `firmware-patch-develop.toml`
//! matches the `develop` branch by exact name.

use std::path::{Path, PathBuf};

use semver::Version;

use crate::error::{PatchError, Result};

const FILE_PREFIX: &str = "firmware-patch-";
const FILE_SUFFIX: &str = ".toml";

/// How a patch artifact addresses firmware generations.
///
/// A single tagged union so the selector's priority rule (name match
/// beats version match) is one ordered match, not two code paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchArtifact {
    /// Matches an exact branch/tag name. Named artifacts are unordered
    /// among themselves; only string equality selects one.
    Named(String),
    /// Valid from this firmware version upward. Totally ordered among
    /// versioned artifacts by the floor.
    Versioned(Version),
}

impl PatchArtifact {
    /// Decode an artifact from a patch file name, or `None` if the name
    /// does not follow the convention.
    pub fn from_file_name(name: &str) -> Option<PatchArtifact> {
        let middle = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
        if middle.is_empty() {
            return None;
        }
        if let Some(rest) = middle.strip_prefix('v') {
            if let Ok(version) = Version::parse(rest) {
                return Some(PatchArtifact::Versioned(version));
            }
        }
        Some(PatchArtifact::Named(middle.to_string()))
    }

    /// Render the canonical file name for this artifact.
    pub fn file_name(&self) -> String {
        match self {
            PatchArtifact::Named(name) => format!("{FILE_PREFIX}{name}{FILE_SUFFIX}"),
            PatchArtifact::Versioned(floor) => format!("{FILE_PREFIX}v{floor}{FILE_SUFFIX}"),
        }
    }
}

impl std::fmt::Display for PatchArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchArtifact::Named(name) => write!(f, "'{name}'"),
            PatchArtifact::Versioned(floor) => write!(f, "v{floor}"),
        }
    }
}

/// One decoded artifact and the bundle file it came from.
#[derive(Debug, Clone)]
pub struct PatchEntry {
    pub artifact: PatchArtifact,
    pub path: PathBuf,
}

/// The set of available patch artifacts.
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    entries: Vec<PatchEntry>,
}

impl PatchSet {
    /// Build a set from decoded entries.
    ///
    /// Two versioned artifacts sharing a floor are an invariant
    /// violation: there is no defensible precedence between them, so the
    /// set is rejected instead of guessing.
    pub fn from_entries(entries: Vec<PatchEntry>) -> Result<Self> {
        let mut floors: Vec<&Version> = entries
            .iter()
            .filter_map(|e| match &e.artifact {
                PatchArtifact::Versioned(floor) => Some(floor),
                PatchArtifact::Named(_) => None,
            })
            .collect();
        floors.sort();
        for pair in floors.windows(2) {
            if pair[0] == pair[1] {
                return Err(PatchError::DuplicateFloor {
                    version: pair[0].to_string(),
                });
            }
        }
        Ok(PatchSet { entries })
    }

    /// Enumerate a patch directory, decoding every conforming file name.
    ///
    /// Files that do not follow the naming convention are ignored; a
    /// missing directory is an empty set.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Ok(PatchSet::default());
        }

        let mut entries = Vec::new();
        for dirent in std::fs::read_dir(dir)? {
            let dirent = dirent?;
            let path = dirent.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(artifact) = PatchArtifact::from_file_name(name) {
                entries.push(PatchEntry { artifact, path });
            }
        }
        // Directory iteration order is platform-defined; sort for
        // deterministic diagnostics.
        entries.sort_by_key(|e| e.path.clone());
        PatchSet::from_entries(entries)
    }

    /// Iterate over the decoded entries.
    pub fn iter(&self) -> impl Iterator<Item = &PatchEntry> {
        self.entries.iter()
    }

    /// Number of artifacts in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
