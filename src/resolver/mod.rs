// src/resolver/mod.rs

//! NEVRA matching
//!
//! Turns a loosely specified package request into one best package or a
//! definitive not-found. The request is routed down exactly one path:
//!
//! 1. `provides` with embedded whitespace is a relational expression
//!    (`foo >= 1.2`) resolved against declared capabilities. Structured
//!    epoch/version/release/arch fields are ignored on this path.
//! 2. Otherwise, any epoch/version/release/arch field triggers a structured
//!    search on name plus those fields, each literal or glob. For installed
//!    targets an empty result is retried on name and arch alone.
//! 3. Otherwise the name is looked up exactly, then as `name.arch`, then as
//!    a combined NEVRA string (`foo-1.2-3.el9.x86_64`, `foo-1.2*`), then as
//!    a provides or wildcard search.
//!
//! Candidates are narrowed to noarch and the native architecture when that
//! leaves something, and the highest version wins.

mod request;
mod selector;

pub use request::{PackageMatchRequest, RepoOverride, RepoScope};
pub use selector::CandidateSelector;

use crate::error::Result;
use crate::packages::{
    PackageFilter, PackageIndex, PackageRecord, ProvidesQuery, Target, filter::has_glob_chars,
};
use crate::version::{Dependency, split_arch};
use glob::Pattern;
use tracing::debug;

/// Result of resolving one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Found(PackageRecord),
    NotFound { name: String },
}

/// Resolves package requests against a package index
#[derive(Debug, Clone)]
pub struct QueryResolver {
    selector: CandidateSelector,
}

impl QueryResolver {
    pub fn new(native_arch: impl Into<String>) -> Self {
        Self {
            selector: CandidateSelector::new(native_arch),
        }
    }

    pub fn native_arch(&self) -> &str {
        self.selector.native_arch()
    }

    /// Resolve a request with its repository overrides applied
    ///
    /// Overrides are undone before this returns, whatever the outcome.
    pub fn resolve(
        &self,
        index: &mut dyn PackageIndex,
        request: &PackageMatchRequest,
        target: Target,
    ) -> Result<MatchOutcome> {
        let scope = RepoScope::apply(index, &request.repos);
        let candidates = self.candidates(scope.index(), request, target)?;
        debug!(
            "{} candidates for '{}' in {} set",
            candidates.len(),
            request.provides,
            target
        );

        let narrowed = self.selector.narrow_by_arch(candidates);
        let outcome = match self.selector.select_best(scope.index(), narrowed) {
            Some(pkg) => MatchOutcome::Found(pkg),
            None => MatchOutcome::NotFound {
                name: request.name_token().to_string(),
            },
        };
        Ok(outcome)
    }

    fn candidates(
        &self,
        index: &dyn PackageIndex,
        request: &PackageMatchRequest,
        target: Target,
    ) -> Result<Vec<PackageRecord>> {
        if request.is_expression() {
            self.by_expression(index, &request.provides, target)
        } else if request.has_nevra_fields() {
            self.by_nevra(index, request, target)
        } else {
            self.by_name(index, request.provides.trim(), target)
        }
    }

    fn by_expression(
        &self,
        index: &dyn PackageIndex,
        expression: &str,
        target: Target,
    ) -> Result<Vec<PackageRecord>> {
        let mut dep = Dependency::parse(expression);

        // `foo.x86_64 >= 1.0` asks for foo on x86_64
        let (base, arch) = split_arch(&dep.name);
        let (base, arch) = (base.to_string(), arch.map(str::to_string));
        if arch.is_some() {
            dep.name = base;
        }

        let found = index.resolve_provides(&ProvidesQuery::Capability(dep), target)?;
        Ok(match arch {
            Some(arch) => found.into_iter().filter(|p| p.arch == arch).collect(),
            None => found,
        })
    }

    fn by_nevra(
        &self,
        index: &dyn PackageIndex,
        request: &PackageMatchRequest,
        target: Target,
    ) -> Result<Vec<PackageRecord>> {
        let name = request.provides.trim();
        let mut filter = PackageFilter::all().name(name);
        if let Some(epoch) = non_empty(&request.epoch) {
            filter = filter.epoch(epoch);
        }
        if let Some(version) = non_empty(&request.version) {
            filter = filter.version(version);
        }
        if let Some(release) = non_empty(&request.release) {
            filter = filter.release(release);
        }
        if let Some(arch) = non_empty(&request.arch) {
            filter = filter.arch(arch);
        }

        let found = index.list(target, &filter)?;
        if !found.is_empty() || target != Target::Installed {
            return Ok(found);
        }

        debug!("No exact installed match for '{}', retrying on name and arch", name);
        let mut fallback = PackageFilter::all().name(name);
        if let Some(arch) = non_empty(&request.arch) {
            fallback = fallback.arch(arch);
        }
        index.list(target, &fallback)
    }

    fn by_name(
        &self,
        index: &dyn PackageIndex,
        name: &str,
        target: Target,
    ) -> Result<Vec<PackageRecord>> {
        let found = index.list(target, &PackageFilter::all().name(name))?;
        if !found.is_empty() {
            return Ok(found);
        }

        if let (base, Some(arch)) = split_arch(name) {
            let found = index.list(target, &PackageFilter::all().name(base).arch(arch))?;
            if !found.is_empty() {
                return Ok(found);
            }
        }

        // `zabbix-agent-4.0.15-1.fc31.x86_64`, `foo-1.2*` and friends
        let found = index.list(target, &PackageFilter::all().nevra(name))?;
        if !found.is_empty() {
            debug!("'{}' matched as a combined NEVRA", name);
            return Ok(found);
        }

        let query = match Pattern::new(name) {
            Ok(pattern) if has_glob_chars(name) => ProvidesQuery::Pattern(pattern),
            _ => ProvidesQuery::Capability(Dependency::named(name)),
        };
        index.resolve_provides(&query, target)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}
