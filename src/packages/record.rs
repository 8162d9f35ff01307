// src/packages/record.rs

//! Package records produced by a package index

use crate::version::{Dependency, Evr, Flag};
use serde::Serialize;
use strum_macros::{Display, EnumString};

/// Where a package record comes from
///
/// The declaration order is the tie-break order used when two candidates
/// have the same version: installed first, then re-installable, then
/// available.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Present in the installed package database only
    Installed,
    /// Installed, and the same NEVRA is also offered by a repository
    Reinstallable,
    /// Offered by a repository, not installed
    Available,
}

impl Origin {
    /// Map the single-letter type code of a package listing
    pub fn from_type_code(code: &str) -> Option<Self> {
        match code {
            "i" => Some(Origin::Installed),
            "r" => Some(Origin::Reinstallable),
            "a" => Some(Origin::Available),
            _ => None,
        }
    }

    pub fn is_installed(self) -> bool {
        matches!(self, Origin::Installed | Origin::Reinstallable)
    }

    pub fn is_available(self) -> bool {
        matches!(self, Origin::Available | Origin::Reinstallable)
    }
}

/// Which package set a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Target {
    Installed,
    Available,
}

/// A repository known to the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub id: String,
    pub enabled: bool,
}

/// One resolved package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    /// Epoch as listed; "0" when the package has none
    pub epoch: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub origin: Origin,
    pub repo_id: Option<String>,
    /// Declared capabilities (may be empty when not computed)
    pub provides: Vec<Dependency>,
}

impl PackageRecord {
    pub fn new(
        name: impl Into<String>,
        epoch: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
        origin: Origin,
    ) -> Self {
        let epoch = epoch.into();
        Self {
            name: name.into(),
            epoch: if epoch.is_empty() { "0".to_string() } else { epoch },
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
            origin,
            repo_id: None,
            provides: Vec::new(),
        }
    }

    /// The epoch/version/release triple of this package
    pub fn evr(&self) -> Evr {
        Evr::new(
            self.epoch.trim().parse::<u64>().unwrap_or(0),
            self.version.clone(),
            (!self.release.is_empty()).then(|| self.release.clone()),
        )
    }

    /// `epoch:version-release` as written on the wire
    pub fn evr_string(&self) -> String {
        format!("{}:{}-{}", self.epoch, self.version, self.release)
    }

    /// `name-epoch:version-release.arch`
    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.evr_string(), self.arch)
    }

    /// The spellings a package can be requested by as one string
    ///
    /// `name`, `name.arch`, `name-version`, `name-version-release`,
    /// `name-version-release.arch`, `name-epoch:version-release.arch` and
    /// `epoch:name-version-release.arch`.
    pub fn nevra_forms(&self) -> [String; 7] {
        let (n, e, v, r, a) = (&self.name, &self.epoch, &self.version, &self.release, &self.arch);
        [
            n.clone(),
            format!("{}.{}", n, a),
            format!("{}-{}", n, v),
            format!("{}-{}-{}", n, v, r),
            format!("{}-{}-{}.{}", n, v, r, a),
            format!("{}-{}:{}-{}.{}", n, e, v, r, a),
            format!("{}:{}-{}-{}.{}", e, n, v, r, a),
        ]
    }

    /// Every package implicitly provides `name = epoch:version-release`
    pub fn self_provide(&self) -> Dependency {
        Dependency::versioned(self.name.clone(), Flag::Eq, self.evr())
    }

    /// Check whether this package provides a capability satisfying `dep`
    pub fn satisfies(&self, dep: &Dependency) -> bool {
        dep.is_satisfied_by(&self.self_provide())
            || self.provides.iter().any(|provide| dep.is_satisfied_by(provide))
    }
}
