// src/packages/mod.rs

//! Package index support for pkghelper
//!
//! The resolver talks to packages only through the [`PackageIndex`] trait.
//! The concrete index is a [`SnapshotIndex`] built from a package listing,
//! with the installed set optionally taken from the system rpm database.

pub mod filter;
pub mod record;
pub mod rpm_query;
pub mod snapshot;
pub mod traits;

pub use filter::{FieldMatch, PackageFilter};
pub use record::{Origin, PackageRecord, Repository, Target};
pub use snapshot::SnapshotIndex;
pub use traits::{PackageIndex, ProvidesQuery};

use crate::config::{IndexConfig, InstalledSource};
use crate::error::{Error, Result};
use tracing::info;

/// Open the package index described by the configuration
pub fn open_index(config: &IndexConfig) -> Result<SnapshotIndex> {
    let mut index = match &config.snapshot {
        Some(path) => SnapshotIndex::load(path)?,
        None if config.installed_source == InstalledSource::Snapshot => {
            return Err(Error::IndexUnavailable(
                "installed source is the snapshot but no snapshot is configured".to_string(),
            ));
        }
        None => SnapshotIndex::new(),
    };

    if config.installed_source == InstalledSource::Rpmdb {
        index.replace_installed(rpm_query::query_installed(&config.rpm_command)?);
    }

    if let Some(names) = &config.install_only {
        index.set_install_only(names.clone());
    }

    info!("Package index opened with {} records", index.len());
    Ok(index)
}
