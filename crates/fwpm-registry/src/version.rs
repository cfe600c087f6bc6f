//! Semantic versioning for plugin constraints.
//!
//! Wraps the `semver` crate and adds the constraint-accumulation logic the
//! resolver needs: a slug requested from several places must satisfy every
//! requester's constraint at once.

use semver::{Comparator, Op};

use crate::error::{RegistryError, Result};

/// A parsed semantic version.
pub type Version = semver::Version;

/// A version constraint (range expression).
pub type Constraint = semver::VersionReq;

/// Parse a version string like "1.2.3" or "2.0.0-beta.1".
///
/// The offending text is echoed back in the error.
pub fn parse_version(s: &str) -> Result<Version> {
    Version::parse(s).map_err(|e| RegistryError::InvalidVersion {
        text: s.to_string(),
        detail: e.to_string(),
    })
}

/// Parse a constraint string like "^1.2.0", "~0.4", "=1.0.0", or
/// ">=1.0.0, <2.0.0". A bare "latest" request is the always-true
/// constraint "*".
pub fn parse_constraint(s: &str) -> Result<Constraint> {
    Constraint::parse(s).map_err(|e| RegistryError::InvalidConstraint {
        text: s.to_string(),
        detail: e.to_string(),
    })
}

/// The always-true constraint, used for bare "latest" requests.
pub fn any_version() -> Constraint {
    Constraint::STAR
}

/// Build the compatible-range constraint from a floor version.
///
/// Caret semantics: same major, at least the given minor/patch, except
/// below 1.0.0, where the minor version is held fixed as well.
pub fn compatible_with(floor: &Version) -> Constraint {
    Constraint {
        comparators: vec![Comparator {
            op: Op::Caret,
            major: floor.major,
            minor: Some(floor.minor),
            patch: Some(floor.patch),
            pre: floor.pre.clone(),
        }],
    }
}

/// Check a version against a conjunction of constraints.
pub fn matches_all(version: &Version, constraints: &[Constraint]) -> bool {
    constraints.iter().all(|c| c.matches(version))
}

/// Select the highest version satisfying every constraint.
///
/// `available` may be in any order; ties cannot occur because catalog
/// versions are unique per slug.
pub fn highest_matching(available: &[Version], constraints: &[Constraint]) -> Option<Version> {
    available
        .iter()
        .filter(|v| matches_all(v, constraints))
        .max()
        .cloned()
}
