// src/protocol.rs

//! Line protocol between the agent and the worker
//!
//! Each request is one JSON object on one line, tagged by `action`:
//!
//! ```text
//! {"action":"whatinstalled","provides":"zlib","arch":"x86_64"}
//! {"action":"whatavailable","provides":"nginx >= 1.20","repos":[{"enable":"epel"}]}
//! {"action":"versioncompare","versions":["1.2-1","1.10-1"]}
//! {"action":"installonlypkgs","package":"kernel"}
//! {"action":"close_rpmdb"}
//! ```
//!
//! Each request gets exactly one response line, plain text by default:
//!
//! ```text
//! zlib 0:1.2.11-31.el9 x86_64
//! doesnotexist nil nil
//! -1
//! True
//! nil nil nil
//! ```

use crate::error::{Error, Result};
use crate::packages::PackageRecord;
use crate::resolver::{MatchOutcome, PackageMatchRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum_macros::{Display, EnumString};

/// Actions the worker understands
pub const ACTIONS: &[&str] = &[
    "whatinstalled",
    "whatavailable",
    "versioncompare",
    "installonlypkgs",
    "close_rpmdb",
];

/// One decoded request line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    /// Best installed package matching the request
    WhatInstalled(PackageMatchRequest),
    /// Best available package matching the request
    WhatAvailable(PackageMatchRequest),
    /// Compare two version strings, either of which may be null
    VersionCompare {
        versions: (Option<String>, Option<String>),
    },
    /// Is the package install-only
    #[serde(rename = "installonlypkgs")]
    InstallOnly { package: String },
    /// Release the package database; the next query reopens it
    #[serde(rename = "close_rpmdb")]
    CloseRpmdb,
}

impl Command {
    /// Decode one request line
    ///
    /// The action tag is checked before any payload field is looked at, so
    /// an unknown action is reported as such even when its payload is odd.
    pub fn decode(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| Error::Protocol(format!("malformed JSON request: {}", e)))?;

        let action = value
            .get("action")
            .ok_or_else(|| Error::Protocol("request has no action".to_string()))?
            .as_str()
            .ok_or_else(|| Error::Protocol("action must be a string".to_string()))?;

        if !ACTIONS.contains(&action) {
            return Err(Error::Protocol(format!("unknown action '{}'", action)));
        }
        let action = action.to_string();

        serde_json::from_value(value)
            .map_err(|e| Error::Protocol(format!("invalid {} request: {}", action, e)))
    }

    /// The wire name of this command's action
    pub fn action(&self) -> &'static str {
        match self {
            Command::WhatInstalled(_) => "whatinstalled",
            Command::WhatAvailable(_) => "whatavailable",
            Command::VersionCompare { .. } => "versioncompare",
            Command::InstallOnly { .. } => "installonlypkgs",
            Command::CloseRpmdb => "close_rpmdb",
        }
    }
}

/// Response encoding
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One response value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Found {
        name: String,
        epoch: String,
        version: String,
        release: String,
        arch: String,
    },
    NotFound {
        name: String,
    },
    Compare(i32),
    Bool(bool),
    Closed,
}

impl From<PackageRecord> for Response {
    fn from(pkg: PackageRecord) -> Self {
        Response::Found {
            name: pkg.name,
            epoch: pkg.epoch,
            version: pkg.version,
            release: pkg.release,
            arch: pkg.arch,
        }
    }
}

impl From<MatchOutcome> for Response {
    fn from(outcome: MatchOutcome) -> Self {
        match outcome {
            MatchOutcome::Found(pkg) => pkg.into(),
            MatchOutcome::NotFound { name } => Response::NotFound { name },
        }
    }
}

impl Response {
    /// Render the response line, without the trailing newline
    pub fn encode(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.to_text(),
            OutputFormat::Json => self.to_json().to_string(),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Response::Found {
                name,
                epoch,
                version,
                release,
                arch,
            } => format!("{} {}:{}-{} {}", name, epoch, version, release, arch),
            Response::NotFound { name } => format!("{} nil nil", name),
            Response::Compare(n) => n.to_string(),
            Response::Bool(true) => "True".to_string(),
            Response::Bool(false) => "False".to_string(),
            Response::Closed => "nil nil nil".to_string(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Response::Found {
                name,
                epoch,
                version,
                release,
                arch,
            } => json!({
                "name": name,
                "epoch": epoch,
                "version": version,
                "release": release,
                "arch": arch,
            }),
            Response::NotFound { name } => json!({ "name": name, "found": false }),
            Response::Compare(n) => json!({ "compare": n }),
            Response::Bool(b) => json!({ "result": b }),
            Response::Closed => json!({ "closed": true }),
        }
    }
}
