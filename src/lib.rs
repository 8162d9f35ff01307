// src/lib.rs

//! pkghelper: a long-lived package database query worker
//!
//! A configuration management agent starts the worker once and then asks it
//! about installed and available packages over a pair of pipes, one JSON
//! request per line and one response line per request. The package index is
//! loaded once and reused for every query.
//!
//! # Architecture
//!
//! - Version comparison: RPM epoch/version/release ordering (rpmvercmp)
//! - Package index: a trait seam over installed and available package sets
//! - Resolver: NEVRA matching with globs, provides expressions and arch narrowing
//! - Lock manager: timeout-bounded exclusive access for privileged workers
//! - Worker: line protocol loop with orphan detection and signal-driven teardown

pub mod config;
mod error;
pub mod lock;
pub mod packages;
pub mod protocol;
pub mod resolver;
pub mod version;
pub mod worker;

pub use config::{ConfigOverrides, IndexConfig, InstalledSource, WorkerConfig};
pub use error::{Error, Result};
pub use lock::{LockManager, LockPolicy, LockState};
pub use packages::{PackageIndex, PackageRecord, SnapshotIndex};
pub use protocol::{Command, OutputFormat, Response};
pub use resolver::{MatchOutcome, PackageMatchRequest, QueryResolver, RepoOverride};
pub use version::{Evr, compare_version_strings, rpmvercmp};
pub use worker::{ProtocolLoop, ShutdownCause, WorkerSession};
