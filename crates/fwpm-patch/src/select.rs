//! Patch selection policy.
//!
//! Given a firmware identifier and the available artifacts, pick the one
//! patch to apply. An exact name match always wins; otherwise the
//! versioned artifact with the highest floor not exceeding the firmware
//! version is chosen.

use crate::artifact::{PatchArtifact, PatchEntry, PatchSet};
use crate::error::{PatchError, Result};
use crate::firmware::FirmwareId;

/// Select the patch artifact for a firmware identifier.
///
/// Returns `NoCompatiblePatch` when nothing qualifies; the caller
/// decides whether that is fatal.
pub fn select<'a>(id: &FirmwareId, set: &'a PatchSet) -> Result<&'a PatchEntry> {
    if let Some(name) = &id.name {
        let named = set.iter().find(|entry| {
            matches!(&entry.artifact, PatchArtifact::Named(n) if n == name)
        });
        if let Some(entry) = named {
            return Ok(entry);
        }
    }

    if let Some(version) = &id.version {
        let best = set
            .iter()
            .filter_map(|entry| match &entry.artifact {
                PatchArtifact::Versioned(floor) if floor <= version => Some((floor, entry)),
                _ => None,
            })
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, entry)| entry);
        if let Some(entry) = best {
            return Ok(entry);
        }
    }

    Err(PatchError::NoCompatiblePatch {
        wanted: id.describe(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use std::path::PathBuf;

    fn set(artifacts: Vec<PatchArtifact>) -> PatchSet {
        let entries = artifacts
            .into_iter()
            .map(|artifact| PatchEntry {
                path: PathBuf::from(artifact.file_name()),
                artifact,
            })
            .collect();
        PatchSet::from_entries(entries).unwrap()
    }

    fn sample_set() -> PatchSet {
        set(vec![
            PatchArtifact::Versioned(Version::new(2, 5, 0)),
            PatchArtifact::Versioned(Version::new(2, 6, 0)),
            PatchArtifact::Named("develop".to_string()),
        ])
    }

    #[test]
    fn highest_floor_at_or_below_firmware_wins() {
        let id = FirmwareId::from_version(Version::new(2, 6, 13));
        let set = sample_set();
        let entry = select(&id, &set).unwrap();
        assert_eq!(
            entry.artifact,
            PatchArtifact::Versioned(Version::new(2, 6, 0))
        );
    }

    #[test]
    fn exact_floor_match_selected() {
        let id = FirmwareId::from_version(Version::new(2, 5, 0));
        let set = sample_set();
        let entry = select(&id, &set).unwrap();
        assert_eq!(
            entry.artifact,
            PatchArtifact::Versioned(Version::new(2, 5, 0))
        );
    }

    #[test]
    fn name_match_beats_version_artifacts() {
        let id = FirmwareId {
            name: Some("develop".to_string()),
            version: Some(Version::new(2, 6, 13)),
        };
        let set = sample_set();
        let entry = select(&id, &set).unwrap();
        assert_eq!(entry.artifact, PatchArtifact::Named("develop".to_string()));
    }

    #[test]
    fn unmatched_name_falls_back_to_version() {
        let id = FirmwareId {
            name: Some("feature-x".to_string()),
            version: Some(Version::new(2, 6, 13)),
        };
        let set = sample_set();
        let entry = select(&id, &set).unwrap();
        assert_eq!(
            entry.artifact,
            PatchArtifact::Versioned(Version::new(2, 6, 0))
        );
    }

    #[test]
    fn no_floor_at_or_below_firmware() {
        let set = set(vec![
            PatchArtifact::Versioned(Version::new(2, 0, 0)),
            PatchArtifact::Versioned(Version::new(2, 5, 0)),
        ]);
        let id = FirmwareId::from_version(Version::new(1, 0, 0));
        let err = select(&id, &set).unwrap_err();
        assert!(matches!(err, PatchError::NoCompatiblePatch { .. }));
    }

    #[test]
    fn unknown_firmware_matches_nothing() {
        let id = FirmwareId::default();
        assert!(select(&id, &sample_set()).is_err());
    }

    #[test]
    fn empty_set_matches_nothing() {
        let id = FirmwareId::from_version(Version::new(2, 6, 13));
        let err = select(&id, &set(vec![])).unwrap_err();
        assert!(err.to_string().contains("2.6.13"));
    }
}
