//! Dependency resolution over a catalog snapshot.
//!
//! Turns a set of root requests into one concrete version per slug, or
//! fails with a diagnosable conflict. The resolver is an iterative
//! fixed-point over a worklist, with no recursion and no backtracking:
//! a slug's accumulated constraints only ever tighten, the newest
//! version satisfying all of them wins, and a constraint that arrives
//! after a slug was chosen re-validates the choice instead of reopening
//! it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::error::{ConstraintSource, RegistryError, Result};
use crate::lockfile::{LockSource, LockedPlugin, Lockfile};
use crate::manifest::PluginManifest;
use crate::version::{self, Constraint};

/// Requester label for constraints coming from the request set itself.
const ROOT_REQUESTER: &str = "(root)";

/// A local-source override for one slug (link mode).
///
/// The manifest is read by the caller before resolution starts; the
/// resolver itself performs no I/O.
#[derive(Debug, Clone)]
pub struct LocalSource {
    /// Linked directory.
    pub path: PathBuf,
    /// The plugin's own manifest, loaded from that directory.
    pub manifest: PluginManifest,
}

/// The root request set for one resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolutionRequest {
    /// Requested plugins (slug → constraint text; "*" means "latest").
    pub requests: BTreeMap<String, String>,
    /// Local-source overrides (slug → linked directory + manifest).
    pub overrides: BTreeMap<String, LocalSource>,
}

impl ResolutionRequest {
    /// Build a request set from (slug, constraint text) pairs.
    pub fn new<I, S, T>(requests: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        ResolutionRequest {
            requests: requests
                .into_iter()
                .map(|(slug, text)| (slug.into(), text.into()))
                .collect(),
            overrides: BTreeMap::new(),
        }
    }

    /// Add a requested plugin.
    pub fn request(&mut self, slug: impl Into<String>, constraint: impl Into<String>) {
        self.requests.insert(slug.into(), constraint.into());
    }

    /// Add a local-source override.
    pub fn link(&mut self, slug: impl Into<String>, source: LocalSource) {
        self.overrides.insert(slug.into(), source);
    }
}

/// One accumulated constraint on a slug, with its provenance.
struct Want {
    source: ConstraintSource,
    constraint: Constraint,
}

/// Resolve a request set against a catalog snapshot.
///
/// Deterministic: equal (requests, catalog) inputs yield an identical
/// lockfile. Terminates on cyclic manifests: every slug is selected at
/// most once (pending entries may be promoted once), and each selected
/// manifest contributes its dependency constraints exactly once.
pub fn resolve(request: &ResolutionRequest, catalog: &Catalog) -> Result<Lockfile> {
    let mut wanted: BTreeMap<String, Vec<Want>> = BTreeMap::new();
    let mut chosen: BTreeMap<String, LockedPlugin> = BTreeMap::new();
    let mut frontier: VecDeque<String> = VecDeque::new();
    // Slugs demanded by a root request or a catalog-resolved dependent.
    // Only these may be fetched from the catalog: overrides cascade to
    // further overrides, never silently to the registry.
    let mut catalog_demand: BTreeSet<String> = BTreeSet::new();

    for (slug, text) in &request.requests {
        let constraint = version::parse_constraint(text)?;
        wanted.entry(slug.clone()).or_default().push(Want {
            source: ConstraintSource {
                requester: ROOT_REQUESTER.to_string(),
                constraint: text.clone(),
            },
            constraint,
        });
        catalog_demand.insert(slug.clone());
        frontier.push_back(slug.clone());
    }

    // Linked plugins resolve even when nothing requests them.
    for slug in request.overrides.keys() {
        if !request.requests.contains_key(slug) {
            frontier.push_back(slug.clone());
        }
    }

    while let Some(slug) = frontier.pop_front() {
        if let Some(entry) = chosen.get(&slug) {
            let promote =
                matches!(entry.source, LockSource::Pending) && catalog_demand.contains(&slug);
            if !promote {
                revalidate(&slug, entry, &wanted)?;
                continue;
            }
            // A slug first seen only through overrides is now demanded by
            // a catalog-resolved dependent: select it for real.
            chosen.remove(&slug);
        }

        if let Some(local) = request.overrides.get(&slug) {
            // Overrides are accepted unconditionally, with no version
            // selection, but their manifests still feed the frontier.
            chosen.insert(
                slug.clone(),
                LockedPlugin {
                    version: Some(local.manifest.version()),
                    source: LockSource::Local {
                        path: local.path.clone(),
                    },
                    checksum: None,
                    dependencies: local.manifest.dependencies.clone(),
                },
            );
            push_dependencies(&slug, &local.manifest, false, &mut wanted, &mut catalog_demand, &mut frontier)?;
            continue;
        }

        if !catalog_demand.contains(&slug) {
            // Demanded only by linked plugins: record as pending instead
            // of auto-installing from the catalog.
            chosen.insert(
                slug.clone(),
                LockedPlugin {
                    version: None,
                    source: LockSource::Pending,
                    checksum: None,
                    dependencies: BTreeMap::new(),
                },
            );
            continue;
        }

        let versions = catalog.versions(&slug);
        if versions.is_empty() {
            return Err(RegistryError::MissingSlug { slug });
        }

        let wants = wanted.get(&slug).map(Vec::as_slice).unwrap_or_default();
        let constraints: Vec<Constraint> =
            wants.iter().map(|w| w.constraint.clone()).collect();
        let Some(picked) = version::highest_matching(&versions, &constraints) else {
            return Err(unsatisfiable(&slug, wants));
        };

        let manifest = catalog
            .manifest(&slug, &picked)
            .ok_or_else(|| RegistryError::MissingSlug { slug: slug.clone() })?;

        chosen.insert(
            slug.clone(),
            LockedPlugin {
                version: Some(picked.clone()),
                source: LockSource::Registry {
                    locator: format!("{slug}/{picked}/plugin.tar"),
                },
                checksum: None,
                dependencies: manifest.dependencies.clone(),
            },
        );
        push_dependencies(&slug, manifest, true, &mut wanted, &mut catalog_demand, &mut frontier)?;
    }

    Ok(Lockfile {
        requests: request.requests.clone(),
        overrides: request
            .overrides
            .iter()
            .map(|(slug, local)| (slug.clone(), local.path.clone()))
            .collect(),
        plugins: chosen,
    })
}

/// Record a selected manifest's dependency constraints and enqueue them.
///
/// `from_catalog` marks whether the dependent itself came from the
/// catalog; only then may its dependencies be fetched from it too.
fn push_dependencies(
    dependent: &str,
    manifest: &PluginManifest,
    from_catalog: bool,
    wanted: &mut BTreeMap<String, Vec<Want>>,
    catalog_demand: &mut BTreeSet<String>,
    frontier: &mut VecDeque<String>,
) -> Result<()> {
    for (dep, text) in &manifest.dependencies {
        let constraint = version::parse_constraint(text)?;
        wanted.entry(dep.clone()).or_default().push(Want {
            source: ConstraintSource {
                requester: dependent.to_string(),
                constraint: text.clone(),
            },
            constraint,
        });
        if from_catalog {
            catalog_demand.insert(dep.clone());
        }
        frontier.push_back(dep.clone());
    }
    Ok(())
}

/// Check an already-chosen entry against every constraint accumulated so
/// far. Local overrides stay accepted unconditionally; pending entries
/// have nothing to check.
fn revalidate(
    slug: &str,
    entry: &LockedPlugin,
    wanted: &BTreeMap<String, Vec<Want>>,
) -> Result<()> {
    if !matches!(entry.source, LockSource::Registry { .. }) {
        return Ok(());
    }
    let Some(picked) = &entry.version else {
        return Ok(());
    };
    let wants = wanted.get(slug).map(Vec::as_slice).unwrap_or_default();
    if wants.iter().all(|w| w.constraint.matches(picked)) {
        Ok(())
    } else {
        Err(unsatisfiable(slug, wants))
    }
}

fn unsatisfiable(slug: &str, wants: &[Want]) -> RegistryError {
    RegistryError::UnsatisfiableConstraint {
        slug: slug.to_string(),
        wanted: wants.iter().map(|w| w.source.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish(catalog: &mut Catalog, slug: &str, version: &str, deps: &[(&str, &str)]) {
        let deps_toml: String = deps
            .iter()
            .map(|(s, c)| format!("{s} = \"{c}\""))
            .collect::<Vec<_>>()
            .join("\n");
        let manifest_str = format!(
            "[plugin]\nslug = \"{slug}\"\nversion = \"{version}\"\n\n[dependencies]\n{deps_toml}\n"
        );
        catalog
            .insert(PluginManifest::parse(&manifest_str).unwrap())
            .unwrap();
    }

    fn local_source(slug: &str, version: &str, deps: &[(&str, &str)]) -> LocalSource {
        let deps_toml: String = deps
            .iter()
            .map(|(s, c)| format!("{s} = \"{c}\""))
            .collect::<Vec<_>>()
            .join("\n");
        let manifest_str = format!(
            "[plugin]\nslug = \"{slug}\"\nversion = \"{version}\"\n\n[dependencies]\n{deps_toml}\n"
        );
        LocalSource {
            path: PathBuf::from(format!("../{slug}")),
            manifest: PluginManifest::parse(&manifest_str).unwrap(),
        }
    }

    #[test]
    fn newest_compatible_wins() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "a", "1.0.0", &[]);
        publish(&mut catalog, "a", "1.1.0", &[]);
        publish(&mut catalog, "a", "1.2.0", &[]);

        let request = ResolutionRequest::new([("a", "^1.0.0")]);
        let lock = resolve(&request, &catalog).unwrap();
        let entry = &lock.plugins["a"];
        assert_eq!(entry.version, Some(semver::Version::new(1, 2, 0)));
    }

    #[test]
    fn latest_request_takes_newest() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "a", "1.0.0", &[]);
        publish(&mut catalog, "a", "2.0.0", &[]);

        let request = ResolutionRequest::new([("a", "*")]);
        let lock = resolve(&request, &catalog).unwrap();
        assert_eq!(
            lock.plugins["a"].version,
            Some(semver::Version::new(2, 0, 0))
        );
    }

    #[test]
    fn transitive_dependencies_resolve_and_close() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "base", "1.0.0", &[]);
        publish(&mut catalog, "mid", "1.0.0", &[("base", "^1.0")]);
        publish(&mut catalog, "top", "1.0.0", &[("mid", "^1.0")]);

        let request = ResolutionRequest::new([("top", "^1.0")]);
        let lock = resolve(&request, &catalog).unwrap();
        assert_eq!(lock.plugins.len(), 3);
        assert!(lock.closure_holds());
    }

    #[test]
    fn shared_dependency_resolved_once() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "shared", "1.0.0", &[]);
        publish(&mut catalog, "shared", "1.3.0", &[]);
        publish(&mut catalog, "a", "1.0.0", &[("shared", "^1.0")]);
        publish(&mut catalog, "b", "1.0.0", &[("shared", ">=1.2.0")]);

        let request = ResolutionRequest::new([("a", "^1.0"), ("b", "^1.0")]);
        let lock = resolve(&request, &catalog).unwrap();
        assert_eq!(
            lock.plugins["shared"].version,
            Some(semver::Version::new(1, 3, 0))
        );
    }

    #[test]
    fn conflict_names_every_requester() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "a", "1.0.0", &[]);
        publish(&mut catalog, "a", "1.1.0", &[]);
        publish(&mut catalog, "dep", "1.0.0", &[("a", "^1.1.0")]);

        let request = ResolutionRequest::new([("a", "=1.0.0"), ("dep", "^1.0")]);
        let err = resolve(&request, &catalog).unwrap_err();
        match err {
            RegistryError::UnsatisfiableConstraint { slug, wanted } => {
                assert_eq!(slug, "a");
                let requesters: Vec<_> =
                    wanted.iter().map(|w| w.requester.as_str()).collect();
                assert!(requesters.contains(&"(root)"));
                assert!(requesters.contains(&"dep"));
            }
            other => panic!("expected UnsatisfiableConstraint, got {other}"),
        }
    }

    #[test]
    fn late_constraint_invalidates_earlier_choice() {
        // Root "*" picks a@2.0.0 before dep's ^1.0 bound arrives; the
        // resolver reports the full chain instead of backtracking.
        let mut catalog = Catalog::new();
        publish(&mut catalog, "a", "1.0.0", &[]);
        publish(&mut catalog, "a", "2.0.0", &[]);
        publish(&mut catalog, "dep", "1.0.0", &[("a", "^1.0")]);

        let request = ResolutionRequest::new([("a", "*"), ("dep", "^1.0")]);
        let err = resolve(&request, &catalog).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnsatisfiableConstraint { .. }
        ));
    }

    #[test]
    fn missing_slug_reported() {
        let catalog = Catalog::new();
        let request = ResolutionRequest::new([("ghost", "^1.0")]);
        let err = resolve(&request, &catalog).unwrap_err();
        assert!(matches!(err, RegistryError::MissingSlug { slug } if slug == "ghost"));
    }

    #[test]
    fn mutually_referencing_manifests_terminate() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "a", "1.0.0", &[("b", "^1.0")]);
        publish(&mut catalog, "b", "1.0.0", &[("a", "^1.0")]);

        let request = ResolutionRequest::new([("a", "^1.0")]);
        let lock = resolve(&request, &catalog).unwrap();
        assert_eq!(lock.plugins.len(), 2);
        assert!(lock.closure_holds());
    }

    #[test]
    fn deterministic_lockfiles() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "base", "1.0.0", &[]);
        publish(&mut catalog, "base", "1.2.0", &[]);
        publish(&mut catalog, "a", "1.0.0", &[("base", "^1.0")]);
        publish(&mut catalog, "b", "1.0.0", &[("base", "^1.0")]);

        let request = ResolutionRequest::new([("a", "^1.0"), ("b", "^1.0")]);
        let first = resolve(&request, &catalog).unwrap();
        let second = resolve(&request, &catalog).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.to_toml().unwrap(),
            second.to_toml().unwrap()
        );
    }

    #[test]
    fn override_accepted_without_version_selection() {
        // Not even published in the catalog; the link wins outright.
        let catalog = Catalog::new();
        let mut request = ResolutionRequest::new([("dev", "^9.9")]);
        request.link("dev", local_source("dev", "0.0.1", &[]));

        let lock = resolve(&request, &catalog).unwrap();
        let entry = &lock.plugins["dev"];
        assert!(matches!(entry.source, LockSource::Local { .. }));
        assert_eq!(entry.version, Some(semver::Version::new(0, 0, 1)));
    }

    #[test]
    fn override_dependencies_recorded_as_pending() {
        let catalog = Catalog::new();
        let mut request = ResolutionRequest::default();
        request.link("dev", local_source("dev", "1.0.0", &[("helper", "^1.0")]));

        let lock = resolve(&request, &catalog).unwrap();
        assert!(matches!(
            lock.plugins["helper"].source,
            LockSource::Pending
        ));
        assert!(lock.closure_holds());
    }

    #[test]
    fn overrides_cascade_to_further_overrides() {
        let catalog = Catalog::new();
        let mut request = ResolutionRequest::default();
        request.link("dev", local_source("dev", "1.0.0", &[("helper", "^1.0")]));
        request.link("helper", local_source("helper", "1.1.0", &[]));

        let lock = resolve(&request, &catalog).unwrap();
        assert!(matches!(
            lock.plugins["helper"].source,
            LockSource::Local { .. }
        ));
    }

    #[test]
    fn pending_promoted_when_catalog_demand_arrives() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "helper", "1.2.0", &[]);
        publish(&mut catalog, "user", "1.0.0", &[("helper", "^1.0")]);

        // The override names helper first; the catalog-resolved "user"
        // then demands it for real.
        let mut request = ResolutionRequest::new([("user", "^1.0")]);
        request.link("dev", local_source("dev", "1.0.0", &[("helper", "^1.0")]));

        let lock = resolve(&request, &catalog).unwrap();
        let entry = &lock.plugins["helper"];
        assert!(matches!(entry.source, LockSource::Registry { .. }));
        assert_eq!(entry.version, Some(semver::Version::new(1, 2, 0)));
    }

    #[test]
    fn registry_locator_recorded() {
        let mut catalog = Catalog::new();
        publish(&mut catalog, "a", "1.0.0", &[]);

        let request = ResolutionRequest::new([("a", "^1.0")]);
        let lock = resolve(&request, &catalog).unwrap();
        match &lock.plugins["a"].source {
            LockSource::Registry { locator } => {
                assert_eq!(locator, "a/1.0.0/plugin.tar");
            }
            other => panic!("expected registry source, got {other:?}"),
        }
    }
}
