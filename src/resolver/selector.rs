// src/resolver/selector.rs

//! Candidate narrowing and best-match selection
//!
//! This module handles selecting the single best package when several
//! records match a request across versions, architectures and repositories.

use crate::packages::{PackageIndex, PackageRecord};
use std::cmp::Ordering;
use tracing::debug;

/// Chooses one package among candidates
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    native_arch: String,
}

impl CandidateSelector {
    pub fn new(native_arch: impl Into<String>) -> Self {
        Self {
            native_arch: native_arch.into(),
        }
    }

    pub fn native_arch(&self) -> &str {
        &self.native_arch
    }

    /// noarch and the native architecture are preferred
    pub fn is_preferred_arch(&self, arch: &str) -> bool {
        arch == "noarch" || arch == self.native_arch
    }

    /// Keep only preferred architectures, unless that would drop everything
    pub fn narrow_by_arch(&self, candidates: Vec<PackageRecord>) -> Vec<PackageRecord> {
        if !candidates.iter().any(|c| self.is_preferred_arch(&c.arch)) {
            debug!(
                "No {} or noarch candidates, keeping all {}",
                self.native_arch,
                candidates.len()
            );
            return candidates;
        }
        candidates
            .into_iter()
            .filter(|c| self.is_preferred_arch(&c.arch))
            .collect()
    }

    /// Select the highest ranked candidate
    ///
    /// Selection criteria (in order of priority):
    /// 1. Version (highest EVR per the index's comparator)
    /// 2. Architecture (lexically greater wins)
    /// 3. Origin (installed, then re-installable, then available)
    /// 4. Repository id (ascending)
    pub fn select_best(
        &self,
        index: &dyn PackageIndex,
        candidates: Vec<PackageRecord>,
    ) -> Option<PackageRecord> {
        candidates
            .into_iter()
            .max_by(|a, b| Self::rank(index, a, b))
    }

    fn rank(index: &dyn PackageIndex, a: &PackageRecord, b: &PackageRecord) -> Ordering {
        index
            .compare(&a.evr(), &b.evr())
            .then_with(|| a.arch.cmp(&b.arch))
            .then_with(|| b.origin.cmp(&a.origin))
            .then_with(|| b.repo_id.cmp(&a.repo_id))
    }
}
