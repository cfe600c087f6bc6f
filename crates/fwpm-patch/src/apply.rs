//! Patch application against a firmware working tree.
//!
//! Each file in a bundle is merged three-way into the target tree:
//! base = the bundle's recorded pre-image, ours = the file on disk,
//! theirs = the bundle's post-image. Conflicts are written in place with
//! markers and reported, never swallowed and never an abort.

use std::path::{Path, PathBuf};

use crate::bundle::{FilePatch, PatchBundle};
use crate::error::Result;
use crate::merge::{merge, MergeOutcome};

/// Per-file outcome lists for one apply run.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Files merged cleanly with changes written.
    pub applied: Vec<PathBuf>,
    /// Files already at the patch's post-image; nothing rewritten.
    pub already_applied: Vec<PathBuf>,
    /// Files the patch created.
    pub created: Vec<PathBuf>,
    /// Files left with conflict markers for manual resolution.
    pub conflicted: Vec<PathBuf>,
}

impl ApplyReport {
    /// Whether the whole bundle went on without conflicts.
    pub fn is_clean(&self) -> bool {
        self.conflicted.is_empty()
    }

    /// Whether every file was already at its post-image.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.created.is_empty() && self.conflicted.is_empty()
    }
}

/// Apply a patch bundle to a firmware tree.
///
/// Only files named by the bundle are touched. I/O failures are errors;
/// merge conflicts are data in the report.
pub fn apply(bundle: &PatchBundle, target_root: &Path) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    for file in &bundle.files {
        let path = target_root.join(&file.path);
        apply_file(file, &path, &mut report)?;
    }

    Ok(report)
}

fn apply_file(file: &FilePatch, path: &Path, report: &mut ApplyReport) -> Result<()> {
    let current = if path.is_file() {
        Some(std::fs::read_to_string(path)?)
    } else {
        None
    };

    match current {
        None if file.base.is_empty() => {
            // Brand-new file.
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &file.patched)?;
            report.created.push(file.path.clone());
        }
        None => {
            // The tree deleted a file the patch modifies: surface it as a
            // conflict with the file recreated around the markers.
            let outcome = merge(&file.base, "", &file.patched);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, outcome.text())?;
            report.conflicted.push(file.path.clone());
        }
        Some(ours) if ours == file.patched => {
            report.already_applied.push(file.path.clone());
        }
        Some(ours) => match merge(&file.base, &ours, &file.patched) {
            MergeOutcome::Clean(text) => {
                if text.is_empty() && file.patched.is_empty() {
                    // The patch deletes this file.
                    std::fs::remove_file(path)?;
                } else {
                    std::fs::write(path, text)?;
                }
                report.applied.push(file.path.clone());
            }
            MergeOutcome::Conflicted { text, .. } => {
                std::fs::write(path, text)?;
                report.conflicted.push(file.path.clone());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{CONFLICT_BEGIN, CONFLICT_END};

    fn bundle_for(path: &str, base: &str, patched: &str) -> PatchBundle {
        PatchBundle {
            files: vec![FilePatch {
                path: PathBuf::from(path),
                base: base.to_string(),
                patched: patched.to_string(),
            }],
        }
    }

    #[test]
    fn clean_apply_to_pristine_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.cpp"), "old\nkeep\n").unwrap();

        let bundle = bundle_for("src/main.cpp", "old\nkeep\n", "new\nkeep\n");
        let report = apply(&bundle, dir.path()).unwrap();

        assert!(report.is_clean());
        assert_eq!(report.applied, vec![PathBuf::from("src/main.cpp")]);
        let content = std::fs::read_to_string(dir.path().join("src/main.cpp")).unwrap();
        assert_eq!(content, "new\nkeep\n");
    }

    #[test]
    fn local_nonconflicting_edits_survive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cfg.h"), "local\nmiddle\nend\n").unwrap();

        // Patch was produced against "start\nmiddle\nend\n" and edits the
        // last line; the tree's local first-line edit must survive.
        let bundle = bundle_for("cfg.h", "start\nmiddle\nend\n", "start\nmiddle\nEND\n");
        let report = apply(&bundle, dir.path()).unwrap();

        assert!(report.is_clean());
        let content = std::fs::read_to_string(dir.path().join("cfg.h")).unwrap();
        assert_eq!(content, "local\nmiddle\nEND\n");
    }

    #[test]
    fn conflicts_marked_in_place_not_aborted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.c"), "mine\n").unwrap();
        std::fs::write(dir.path().join("b.c"), "base-b\n").unwrap();

        let bundle = PatchBundle {
            files: vec![
                FilePatch {
                    path: PathBuf::from("a.c"),
                    base: "base-a\n".to_string(),
                    patched: "patched-a\n".to_string(),
                },
                FilePatch {
                    path: PathBuf::from("b.c"),
                    base: "base-b\n".to_string(),
                    patched: "patched-b\n".to_string(),
                },
            ],
        };
        let report = apply(&bundle, dir.path()).unwrap();

        // a.c conflicts, b.c still applies.
        assert_eq!(report.conflicted, vec![PathBuf::from("a.c")]);
        assert_eq!(report.applied, vec![PathBuf::from("b.c")]);

        let conflicted = std::fs::read_to_string(dir.path().join("a.c")).unwrap();
        assert!(conflicted.contains(CONFLICT_BEGIN));
        assert!(conflicted.contains("mine"));
        assert!(conflicted.contains("patched-a"));
        assert!(conflicted.contains(CONFLICT_END));
    }

    #[test]
    fn reapply_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.c"), "v2\n").unwrap();

        let bundle = bundle_for("x.c", "v1\n", "v2\n");
        let first = apply(&bundle, dir.path()).unwrap();
        assert_eq!(first.already_applied, vec![PathBuf::from("x.c")]);
        assert!(first.is_noop());

        // Unrelated files are untouched either way.
        std::fs::write(dir.path().join("other.c"), "unrelated\n").unwrap();
        let second = apply(&bundle, dir.path()).unwrap();
        assert!(second.is_noop());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("other.c")).unwrap(),
            "unrelated\n"
        );
    }

    #[test]
    fn patch_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let bundle = bundle_for("src/new_module.cpp", "", "fresh content\n");
        let report = apply(&bundle, dir.path()).unwrap();

        assert_eq!(report.created, vec![PathBuf::from("src/new_module.cpp")]);
        let content =
            std::fs::read_to_string(dir.path().join("src/new_module.cpp")).unwrap();
        assert_eq!(content, "fresh content\n");
    }

    #[test]
    fn locally_deleted_file_surfaces_as_conflict() {
        let dir = tempfile::tempdir().unwrap();
        // Tree has no trace of the file the patch wants to modify.
        let bundle = bundle_for("gone.c", "base\n", "patched\n");
        let report = apply(&bundle, dir.path()).unwrap();

        assert_eq!(report.conflicted, vec![PathBuf::from("gone.c")]);
        let content = std::fs::read_to_string(dir.path().join("gone.c")).unwrap();
        assert!(content.contains(CONFLICT_BEGIN));
    }

    #[test]
    fn patch_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("legacy.c"), "old code\n").unwrap();

        let bundle = bundle_for("legacy.c", "old code\n", "");
        let report = apply(&bundle, dir.path()).unwrap();

        assert!(report.is_clean());
        assert!(!dir.path().join("legacy.c").exists());
    }
}
