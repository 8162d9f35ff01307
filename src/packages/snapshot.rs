// src/packages/snapshot.rs

//! In-memory package index built from a package listing
//!
//! The listing is line oriented. Each package record is
//!
//! ```text
//! name epoch version release arch [provides, ...] type repoid
//! ```
//!
//! where `type` is `i` (installed), `a` (available) or `r` (installed and
//! re-installable from a repository). Two directive lines are recognized:
//!
//! ```text
//! [repo] updates enabled
//! [option installonlypkgs] kernel kernel-devel
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use super::filter::PackageFilter;
use super::record::{Origin, PackageRecord, Repository, Target};
use super::traits::{PackageIndex, ProvidesQuery};
use crate::error::{Error, Result};
use crate::version::Dependency;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Install-only names used when the listing does not declare its own
pub const DEFAULT_INSTALL_ONLY: &[&str] = &[
    "kernel",
    "kernel-bigmem",
    "installonlypkg(kernel)",
    "installonlypkg(kernel-module)",
    "installonlypkg(vm)",
    "multiversion(kernel)",
];

const REPO_DIRECTIVE: &str = "[repo]";
const INSTALL_ONLY_DIRECTIVE: &str = "[option installonlypkgs]";

/// Package index held entirely in memory
#[derive(Debug, Clone)]
pub struct SnapshotIndex {
    records: Vec<PackageRecord>,
    repos: BTreeMap<String, bool>,
    install_only: Vec<String>,
}

impl Default for SnapshotIndex {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            repos: BTreeMap::new(),
            install_only: DEFAULT_INSTALL_ONLY.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SnapshotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from records; their repositories start enabled
    pub fn from_records(records: impl IntoIterator<Item = PackageRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.push(record);
        }
        index
    }

    /// Load a listing from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::IndexUnavailable(format!("cannot read listing {}: {}", path.display(), e))
        })?;
        let index = Self::parse(&content)?;
        debug!(
            "Loaded {} records and {} repositories from {}",
            index.records.len(),
            index.repos.len(),
            path.display()
        );
        Ok(index)
    }

    /// Parse a listing
    pub fn parse(content: &str) -> Result<Self> {
        let mut index = Self::new();

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix(INSTALL_ONLY_DIRECTIVE) {
                index.install_only = rest.split_whitespace().map(str::to_string).collect();
            } else if let Some(rest) = line.strip_prefix(REPO_DIRECTIVE) {
                let (id, enabled) = parse_repo_directive(rest)
                    .ok_or_else(|| line_error(lineno, "expected `[repo] <id> enabled|disabled`"))?;
                index.add_repository(id, enabled);
            } else {
                let record = parse_record(line).map_err(|msg| line_error(lineno, msg))?;
                index.push(record);
            }
        }

        Ok(index)
    }

    /// Add a record, registering its repository as enabled if unseen
    pub fn push(&mut self, record: PackageRecord) {
        if record.origin.is_available()
            && let Some(repo) = &record.repo_id
        {
            self.repos.entry(repo.clone()).or_insert(true);
        }
        self.records.push(record);
    }

    /// Declare a repository and its initial state
    pub fn add_repository(&mut self, id: impl Into<String>, enabled: bool) {
        self.repos.insert(id.into(), enabled);
    }

    pub fn set_install_only(&mut self, names: Vec<String>) {
        self.install_only = names;
    }

    /// Replace the installed set with records from another source
    ///
    /// Re-installable records fall back to available. An incoming installed
    /// record whose NEVRA is also offered by a repository marks that
    /// repository record re-installable instead of being added twice.
    pub fn replace_installed(&mut self, installed: Vec<PackageRecord>) {
        self.records.retain(|r| r.origin != Origin::Installed);
        for record in &mut self.records {
            if record.origin == Origin::Reinstallable {
                record.origin = Origin::Available;
            }
        }

        for mut pkg in installed {
            if let Some(existing) = self
                .records
                .iter_mut()
                .find(|r| r.origin == Origin::Available && r.nevra() == pkg.nevra())
            {
                existing.origin = Origin::Reinstallable;
                if existing.provides.is_empty() {
                    existing.provides = pkg.provides;
                }
                continue;
            }
            pkg.origin = Origin::Installed;
            self.records.push(pkg);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn is_visible(&self, record: &PackageRecord, target: Target) -> bool {
        match target {
            Target::Installed => record.origin.is_installed(),
            Target::Available => {
                record.origin.is_available()
                    && record
                        .repo_id
                        .as_ref()
                        .is_none_or(|repo| self.repos.get(repo).copied().unwrap_or(true))
            }
        }
    }

    fn visible(&self, target: Target) -> impl Iterator<Item = &PackageRecord> {
        self.records.iter().filter(move |r| self.is_visible(r, target))
    }
}

impl PackageIndex for SnapshotIndex {
    fn list_installed(&self, filter: &PackageFilter) -> Result<Vec<PackageRecord>> {
        Ok(self
            .visible(Target::Installed)
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn list_available(&self, filter: &PackageFilter) -> Result<Vec<PackageRecord>> {
        Ok(self
            .visible(Target::Available)
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn resolve_provides(
        &self,
        query: &ProvidesQuery,
        target: Target,
    ) -> Result<Vec<PackageRecord>> {
        let matched = self.visible(target).filter(|r| match query {
            ProvidesQuery::Capability(dep) => r.satisfies(dep),
            ProvidesQuery::Pattern(pattern) => {
                pattern.matches(&r.name) || r.provides.iter().any(|p| pattern.matches(&p.name))
            }
        });
        Ok(matched.cloned().collect())
    }

    fn repositories(&self) -> Vec<Repository> {
        self.repos
            .iter()
            .map(|(id, enabled)| Repository {
                id: id.clone(),
                enabled: *enabled,
            })
            .collect()
    }

    fn set_repository_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.repos.get_mut(id) {
            Some(state) => {
                *state = enabled;
                true
            }
            None => {
                warn!("Unknown repository '{}'", id);
                false
            }
        }
    }

    fn install_only_packages(&self) -> Vec<String> {
        self.install_only.clone()
    }

    fn close(&mut self) {
        debug!("Dropping {} package records", self.records.len());
        self.records.clear();
    }
}

fn line_error(lineno: usize, msg: &str) -> Error {
    Error::ParseError(format!("listing line {}: {}", lineno + 1, msg))
}

fn parse_repo_directive(rest: &str) -> Option<(&str, bool)> {
    let mut parts = rest.split_whitespace();
    let id = parts.next()?;
    let enabled = match parts.next()? {
        "enabled" => true,
        "disabled" => false,
        _ => return None,
    };
    Some((id, enabled))
}

/// Parse one package record line
fn parse_record(line: &str) -> std::result::Result<PackageRecord, &'static str> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 7 {
        return Err("expected `name epoch version release arch [provides] type repoid`");
    }

    let n = tokens.len();
    let origin = Origin::from_type_code(tokens[n - 2]).ok_or("type must be one of i, a, r")?;

    let mut record = PackageRecord::new(
        tokens[0], tokens[1], tokens[2], tokens[3], tokens[4], origin,
    );
    record.repo_id = Some(tokens[n - 1].to_string());
    record.provides = parse_provides(&tokens[5..n - 2].join(" "));
    Ok(record)
}

/// Parse a bracketed, comma separated provides list
///
/// Entries may be quoted: `['foo = 1.0-1', 'foo(x86-64) = 1.0-1']`.
fn parse_provides(text: &str) -> Vec<Dependency> {
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(|entry| entry.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|entry| !entry.is_empty())
        .map(Dependency::parse)
        .collect()
}
