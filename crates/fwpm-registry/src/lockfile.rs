//! Lockfile model: the persisted, reproducible snapshot of a resolution.
//!
//! The lockfile (`fwpm.lock`) is human-diffable TOML. It records the
//! request set it was generated from and one entry per resolved plugin,
//! so a later invocation can decide whether re-resolution is needed
//! without consulting the live catalog.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::resolution::ResolutionRequest;
use crate::version::{self, Version};

/// Where a locked plugin came from.
///
/// One tagged union rather than separate entry kinds, so the closure
/// check and serialization stay uniform over a single concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockSource {
    /// A catalog archive, addressed by its registry locator.
    Registry { locator: String },
    /// A linked local directory (link mode override).
    Local { path: PathBuf },
    /// Requested by a linked plugin but neither linked nor installed.
    ///
    /// Overrides only cascade to further overrides; their unresolved
    /// dependencies are recorded here instead of being fetched.
    Pending,
}

impl LockSource {
    /// Render as a single locator string for the lockfile.
    pub fn to_locator(&self) -> String {
        match self {
            LockSource::Registry { locator } => format!("registry+{locator}"),
            LockSource::Local { path } => format!("local+{}", path.display()),
            LockSource::Pending => "pending".to_string(),
        }
    }

    /// Parse a locator string back into a source.
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(locator) = s.strip_prefix("registry+") {
            Ok(LockSource::Registry {
                locator: locator.to_string(),
            })
        } else if let Some(path) = s.strip_prefix("local+") {
            Ok(LockSource::Local {
                path: PathBuf::from(path),
            })
        } else if s == "pending" {
            Ok(LockSource::Pending)
        } else {
            Err(RegistryError::InvalidManifest {
                detail: format!("unknown lock source '{s}'"),
            })
        }
    }
}

impl Serialize for LockSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_locator())
    }
}

impl<'de> Deserialize<'de> for LockSource {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LockSource::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// One resolved plugin in the lockfile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedPlugin {
    /// Chosen version. Absent for pending entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Where the plugin came from.
    pub source: LockSource,
    /// SHA-256 of the registry archive, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Dependency constraints this entry was resolved with
    /// (slug → constraint text, sorted).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

/// Outcome of validating a lockfile against a request set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// The lock already satisfies the requests; no re-resolution needed.
    Reusable,
    /// The requests or internal constraints have drifted; re-resolve.
    Stale,
}

/// A persisted resolution outcome.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Lockfile {
    /// The top-level request set this lock was generated from
    /// (slug → constraint text).
    #[serde(default)]
    pub requests: BTreeMap<String, String>,
    /// Local-source overrides in effect at resolution time
    /// (slug → linked path).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, PathBuf>,
    /// Resolved entries, sorted by slug.
    #[serde(default)]
    pub plugins: BTreeMap<String, LockedPlugin>,
}

impl Lockfile {
    /// Parse a lockfile from TOML text.
    pub fn parse(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Serialize to TOML. Maps are sorted, so equal locks render
    /// byte-identically.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RegistryError::InvalidManifest {
            detail: format!("failed to serialize lockfile: {e}"),
        })
    }

    /// Load from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Write to a file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Decide whether this lock still satisfies a request set.
    ///
    /// Reusability depends only on internal consistency; the live
    /// catalog is never consulted, so a version later yanked from the
    /// catalog does not invalidate an existing lock.
    pub fn validate(&self, request: &ResolutionRequest) -> LockState {
        // Every requested slug/constraint pair must be recorded unchanged.
        for (slug, text) in &request.requests {
            if self.requests.get(slug) != Some(text) {
                return LockState::Stale;
            }
        }

        // The link set must be identical: adding or removing an override
        // changes how its dependencies cascade.
        let lock_overrides: BTreeMap<&String, &PathBuf> = self.overrides.iter().collect();
        let req_overrides: BTreeMap<&String, &PathBuf> = request
            .overrides
            .iter()
            .map(|(slug, local)| (slug, &local.path))
            .collect();
        if lock_overrides != req_overrides {
            return LockState::Stale;
        }

        // Each requested slug must be locked at a satisfying version.
        for (slug, text) in &request.requests {
            let Some(entry) = self.plugins.get(slug) else {
                return LockState::Stale;
            };
            if !entry_satisfies(entry, text) {
                return LockState::Stale;
            }
        }

        // Internal consistency: every dependency edge closes over the
        // lock and still satisfies its recorded constraint.
        for entry in self.plugins.values() {
            for (dep, text) in &entry.dependencies {
                let Some(dep_entry) = self.plugins.get(dep) else {
                    return LockState::Stale;
                };
                if !entry_satisfies(dep_entry, text) {
                    return LockState::Stale;
                }
            }
        }

        LockState::Reusable
    }

    /// Check the closure invariant: every dependency slug named by any
    /// entry is itself a key of the lock.
    pub fn closure_holds(&self) -> bool {
        self.plugins
            .values()
            .flat_map(|e| e.dependencies.keys())
            .all(|dep| self.plugins.contains_key(dep))
    }

    /// Slugs of locked plugins that depend on `slug`.
    pub fn dependents_of(&self, slug: &str) -> Vec<String> {
        self.plugins
            .iter()
            .filter(|(other, entry)| *other != slug && entry.dependencies.contains_key(slug))
            .map(|(other, _)| other.clone())
            .collect()
    }
}

/// Whether a locked entry satisfies a constraint text.
///
/// Local entries were accepted unconditionally at resolution time and
/// stay accepted; pending entries are unsatisfied by design and do not
/// invalidate the lock. A malformed constraint reads as unsatisfied,
/// which safely forces re-resolution.
fn entry_satisfies(entry: &LockedPlugin, constraint_text: &str) -> bool {
    match &entry.source {
        LockSource::Local { .. } | LockSource::Pending => true,
        LockSource::Registry { .. } => match (&entry.version, version::parse_constraint(constraint_text)) {
            (Some(v), Ok(c)) => c.matches(v),
            _ => false,
        },
    }
}
