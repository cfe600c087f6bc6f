//! Firmware identifier detection.
//!
//! Patch selection needs to know which generation of the base firmware
//! it is targeting: an exact branch/tag name, a SemVer version, or both.
//! Detection is best-effort and purely filesystem-based: the branch
//! comes from `.git/HEAD`, the version from `version.properties`.

use std::path::Path;

use semver::Version;

/// The identity of a firmware working tree, as far as it can be told.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareId {
    /// Current branch or tag name, leading `v` stripped.
    pub name: Option<String>,
    /// Firmware version, when one could be parsed.
    pub version: Option<Version>,
}

impl FirmwareId {
    /// Identifier for an exact branch/tag name.
    pub fn named(name: impl Into<String>) -> Self {
        FirmwareId {
            name: Some(strip_v(&name.into())),
            version: None,
        }
    }

    /// Identifier for a firmware version.
    pub fn from_version(version: Version) -> Self {
        FirmwareId {
            name: None,
            version: Some(version),
        }
    }

    /// Parse a user-supplied identifier: a tag like `v2.6.13` becomes a
    /// version, anything else an exact name.
    pub fn parse(text: &str) -> Self {
        let stripped = strip_v(text);
        match Version::parse(&stripped) {
            Ok(version) => FirmwareId::from_version(version),
            Err(_) => FirmwareId {
                name: Some(stripped),
                version: None,
            },
        }
    }

    /// Detect the identifier of a firmware tree.
    ///
    /// Either field may come back empty; the selector treats an entirely
    /// unknown identifier as matching nothing.
    pub fn detect(root: &Path) -> Self {
        FirmwareId {
            name: detect_branch(root),
            version: detect_version(root),
        }
    }

    /// Whether nothing at all could be detected.
    pub fn is_unknown(&self) -> bool {
        self.name.is_none() && self.version.is_none()
    }

    /// Human-readable description for diagnostics.
    pub fn describe(&self) -> String {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => format!("firmware '{name}' (v{version})"),
            (Some(name), None) => format!("firmware '{name}'"),
            (None, Some(version)) => format!("firmware v{version}"),
            (None, None) => "unidentified firmware".to_string(),
        }
    }
}

fn strip_v(text: &str) -> String {
    text.strip_prefix('v').unwrap_or(text).to_string()
}

/// Read the current branch name from `.git/HEAD`, if the tree is a git
/// checkout on a branch (detached HEAD yields nothing).
fn detect_branch(root: &Path) -> Option<String> {
    let head = std::fs::read_to_string(root.join(".git").join("HEAD")).ok()?;
    let reference = head.trim().strip_prefix("ref: refs/heads/")?;
    if reference.is_empty() {
        return None;
    }
    Some(strip_v(reference))
}

/// Read the firmware version from `version.properties` (`major`,
/// `minor`, `build` keys).
fn detect_version(root: &Path) -> Option<Version> {
    let content = std::fs::read_to_string(root.join("version.properties")).ok()?;

    let mut major = None;
    let mut minor = None;
    let mut build = None;
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().parse::<u64>().ok();
        match key.trim() {
            "major" => major = value,
            "minor" => minor = value,
            "build" => build = value,
            _ => {}
        }
    }

    Some(Version::new(major?, minor?, build?))
}
