//! Patch bundle format.
//!
//! A bundle is a TOML document recording, for every file the patch
//! touches, the pre-image the patch was produced against and the
//! post-image it yields. Carrying full images (rather than a unified
//! diff) gives the applier a real merge base, so local edits in the
//! target tree can survive.
//!
//! ```toml
//! [[file]]
//! path = "src/loader.cpp"
//! base = """..."""
//! patched = """..."""
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PatchError, Result};

/// One file's worth of patch content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePatch {
    /// Path relative to the firmware tree root.
    pub path: PathBuf,
    /// Recorded pre-image. Empty for files the patch creates.
    #[serde(default)]
    pub base: String,
    /// Post-image after the patch.
    pub patched: String,
}

/// A complete patch bundle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatchBundle {
    /// Touched files, in bundle order.
    #[serde(default, rename = "file")]
    pub files: Vec<FilePatch>,
}

impl PatchBundle {
    /// Parse a bundle from TOML text, enforcing its invariants.
    pub fn parse(input: &str, origin: &Path) -> Result<Self> {
        let bundle: PatchBundle = toml::from_str(input)?;

        let mut seen = std::collections::BTreeSet::new();
        for file in &bundle.files {
            if file.path.as_os_str().is_empty() {
                return Err(PatchError::InvalidBundle {
                    path: origin.to_path_buf(),
                    detail: "file entry with empty path".to_string(),
                });
            }
            if file.path.is_absolute() {
                return Err(PatchError::InvalidBundle {
                    path: origin.to_path_buf(),
                    detail: format!("absolute path '{}'", file.path.display()),
                });
            }
            if !seen.insert(&file.path) {
                return Err(PatchError::InvalidBundle {
                    path: origin.to_path_buf(),
                    detail: format!("duplicate entry for '{}'", file.path.display()),
                });
            }
        }

        Ok(bundle)
    }

    /// Load a bundle from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Serialize this bundle to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PatchError::InvalidBundle {
            path: PathBuf::new(),
            detail: format!("failed to serialize: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bundle() {
        let input = r#"
[[file]]
path = "src/loader.cpp"
base = "old line\n"
patched = "new line\n"

[[file]]
path = "src/hooks.h"
patched = "created content\n"
"#;
        let bundle = PatchBundle::parse(input, Path::new("test.toml")).unwrap();
        assert_eq!(bundle.files.len(), 2);
        assert_eq!(bundle.files[0].base, "old line\n");
        // Omitted base means the patch creates the file.
        assert!(bundle.files[1].base.is_empty());
    }

    #[test]
    fn reject_duplicate_paths() {
        let input = r#"
[[file]]
path = "a.c"
patched = "x"

[[file]]
path = "a.c"
patched = "y"
"#;
        let err = PatchBundle::parse(input, Path::new("dup.toml")).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn reject_absolute_paths() {
        let input = r#"
[[file]]
path = "/etc/passwd"
patched = "x"
"#;
        assert!(PatchBundle::parse(input, Path::new("abs.toml")).is_err());
    }

    #[test]
    fn toml_round_trip() {
        let bundle = PatchBundle {
            files: vec![FilePatch {
                path: PathBuf::from("src/main.cpp"),
                base: "a\nb\n".to_string(),
                patched: "a\nc\n".to_string(),
            }],
        };
        let text = bundle.to_toml().unwrap();
        let reparsed = PatchBundle::parse(&text, Path::new("rt.toml")).unwrap();
        assert_eq!(reparsed, bundle);
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firmware-patch-v1.0.0.toml");
        std::fs::write(
            &path,
            "[[file]]\npath = \"x.c\"\nbase = \"\"\npatched = \"hi\\n\"\n",
        )
        .unwrap();

        let bundle = PatchBundle::load(&path).unwrap();
        assert_eq!(bundle.files.len(), 1);
    }
}
