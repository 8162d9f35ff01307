// src/packages/rpm_query.rs

//! Query installed RPM packages from the system database
//!
//! The installed set, with each package's declared provides, is read in one
//! pass through the `rpm` command-line tool.

use super::record::{Origin, PackageRecord};
use crate::error::{Error, Result};
use crate::version::Dependency;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// One line per package: NEVRA fields, then `;`-terminated provides
const QUERY_FORMAT: &str = "%{NAME}|%{EPOCH}|%{VERSION}|%{RELEASE}|%{ARCH}|[%{PROVIDENAME} %{PROVIDEFLAGS:depflags} %{PROVIDEVERSION};]\n";

/// Locate the rpm binary
pub fn find_rpm(command: &str) -> Result<PathBuf> {
    which::which(command).map_err(|e| {
        Error::IndexUnavailable(format!("rpm command '{}' not found: {}", command, e))
    })
}

/// List every installed package with its provides
pub fn query_installed(command: &str) -> Result<Vec<PackageRecord>> {
    let rpm = find_rpm(command)?;
    debug!("Querying installed packages with {}", rpm.display());

    let output = Command::new(&rpm)
        .args(["-qa", "--queryformat", QUERY_FORMAT])
        .output()
        .map_err(|e| Error::IndexUnavailable(format!("Failed to run rpm: {}", e)))?;

    if !output.status.success() {
        return Err(Error::IndexUnavailable(format!(
            "rpm -qa failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let packages = parse_query_output(&String::from_utf8_lossy(&output.stdout));
    debug!("Found {} installed packages", packages.len());
    Ok(packages)
}

/// Parse the output of `rpm -qa` run with [`QUERY_FORMAT`]
///
/// Pseudo-packages without an architecture (gpg-pubkey) are skipped, as are
/// lines that do not have all six fields.
pub fn parse_query_output(output: &str) -> Vec<PackageRecord> {
    let mut packages = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.splitn(6, '|').collect();
        let [name, epoch, version, release, arch, provides] = parts.as_slice() else {
            warn!("Unexpected rpm output line: {}", line);
            continue;
        };

        if *arch == "(none)" {
            debug!("Skipping pseudo-package {}", name);
            continue;
        }

        let epoch = if *epoch == "(none)" { "0" } else { *epoch };
        let mut pkg = PackageRecord::new(*name, epoch, *version, *release, *arch, Origin::Installed);
        pkg.provides = provides
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Dependency::parse)
            .collect();
        packages.push(pkg);
    }

    packages
}
