// src/packages/traits.rs

//! The package index seam
//!
//! Everything the resolver needs from the underlying package manager goes
//! through [`PackageIndex`]. Version-specific adaptation to a particular
//! engine lives behind this trait, never in the resolver or protocol loop.

use super::filter::PackageFilter;
use super::record::{PackageRecord, Repository, Target};
use crate::error::Result;
use crate::version::{Dependency, Evr};
use glob::Pattern;
use std::cmp::Ordering;

/// A provides lookup: a relational capability or a glob over names
#[derive(Debug, Clone)]
pub enum ProvidesQuery {
    /// `name [OP evr]`, matched with provide/require semantics
    Capability(Dependency),
    /// Wildcard matched against package names and provide names
    Pattern(Pattern),
}

/// Read-only view of installed and available packages
pub trait PackageIndex: Send {
    /// Installed packages matching the filter
    fn list_installed(&self, filter: &PackageFilter) -> Result<Vec<PackageRecord>>;

    /// Packages available from enabled repositories matching the filter
    fn list_available(&self, filter: &PackageFilter) -> Result<Vec<PackageRecord>>;

    /// Packages in the target set providing the queried capability
    fn resolve_provides(&self, query: &ProvidesQuery, target: Target)
    -> Result<Vec<PackageRecord>>;

    /// Order two EVR triples
    fn compare(&self, a: &Evr, b: &Evr) -> Ordering {
        a.compare(b)
    }

    /// Repositories known to the index with their current state
    fn repositories(&self) -> Vec<Repository>;

    /// Enable or disable one repository, returning false if it is unknown
    fn set_repository_enabled(&mut self, id: &str, enabled: bool) -> bool;

    /// Names and capabilities that may be installed in several versions at once
    fn install_only_packages(&self) -> Vec<String>;

    /// Release any resources held by the index
    fn close(&mut self) {}

    /// Dispatch a listing to the target set
    fn list(&self, target: Target, filter: &PackageFilter) -> Result<Vec<PackageRecord>> {
        match target {
            Target::Installed => self.list_installed(filter),
            Target::Available => self.list_available(filter),
        }
    }
}
