//! Plugin catalog and dependency-resolution engine for fwpm.
//!
//! Resolves requested firmware plugins and their declared version
//! constraints against a catalog snapshot, producing a reproducible
//! lockfile, and manages the local content-addressed plugin cache.
//!
//! # Architecture
//!
//! Resolution is a pure, synchronous computation over immutable inputs:
//! the catalog snapshot is assembled first (by a `CatalogBackend`), the
//! resolver walks it without I/O, and the resulting `Lockfile` is the
//! only artifact handed back for persistence. Catalog transport and
//! install materialization live in the CLI, not here.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod integrity;
pub mod lockfile;
pub mod manifest;
pub mod resolution;
pub mod tree;
pub mod version;

// Re-exports for convenience.
pub use cache::PluginCache;
pub use catalog::{Catalog, CatalogBackend, LocalCatalog};
pub use error::{ConstraintSource, RegistryError, Result};
pub use integrity::ContentHash;
pub use lockfile::{LockSource, LockState, LockedPlugin, Lockfile};
pub use manifest::PluginManifest;
pub use resolution::{resolve, LocalSource, ResolutionRequest};
pub use tree::{format_lock, format_tree};
pub use version::{compatible_with, parse_constraint, parse_version, Constraint, Version};
