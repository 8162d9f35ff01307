// src/resolver/request.rs

//! Package match requests and request-scoped repository overrides

use crate::packages::{FieldMatch, PackageIndex, Repository};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Enable or disable repositories whose id matches a glob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoOverride {
    Enable(String),
    Disable(String),
}

impl RepoOverride {
    fn pattern(&self) -> &str {
        match self {
            RepoOverride::Enable(p) | RepoOverride::Disable(p) => p,
        }
    }

    fn enables(&self) -> bool {
        matches!(self, RepoOverride::Enable(_))
    }
}

/// Payload of `whatinstalled` and `whatavailable`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMatchRequest {
    /// A name, a glob, or a `name OP version` expression
    pub provides: String,
    #[serde(default)]
    pub epoch: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub repos: Vec<RepoOverride>,
}

impl PackageMatchRequest {
    pub fn new(provides: impl Into<String>) -> Self {
        Self {
            provides: provides.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn with_repos(mut self, repos: Vec<RepoOverride>) -> Self {
        self.repos = repos;
        self
    }

    /// Embedded whitespace selects the expression path
    pub fn is_expression(&self) -> bool {
        self.provides.trim().contains(char::is_whitespace)
    }

    /// Whether any of epoch, version, release or arch is given
    pub fn has_nevra_fields(&self) -> bool {
        [&self.epoch, &self.version, &self.release, &self.arch]
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
    }

    /// The requested name: text before the first whitespace in `provides`
    pub fn name_token(&self) -> &str {
        self.provides.split_whitespace().next().unwrap_or_default()
    }
}

/// Repository overrides applied for the duration of one request
///
/// The prior enabled state of every repository is recorded on creation and
/// restored when the scope is dropped, on success and on error alike.
pub struct RepoScope<'a> {
    index: &'a mut dyn PackageIndex,
    saved: Vec<Repository>,
}

impl<'a> RepoScope<'a> {
    /// Apply overrides in request order
    pub fn apply(index: &'a mut dyn PackageIndex, overrides: &[RepoOverride]) -> Self {
        let saved = if overrides.is_empty() {
            Vec::new()
        } else {
            index.repositories()
        };

        for over in overrides {
            let matcher = FieldMatch::new(over.pattern());
            let mut matched = false;
            for repo in saved.iter().filter(|r| matcher.matches(&r.id)) {
                matched = true;
                index.set_repository_enabled(&repo.id, over.enables());
            }
            if matched {
                debug!("Applied repository override {:?}", over);
            } else {
                warn!("Repository override {:?} matched no repository", over);
            }
        }

        Self { index, saved }
    }

    pub fn index(&self) -> &dyn PackageIndex {
        &*self.index
    }
}

impl Drop for RepoScope<'_> {
    fn drop(&mut self) {
        if self.saved.is_empty() {
            return;
        }
        let current = self.index.repositories();
        for repo in &self.saved {
            let changed = current
                .iter()
                .any(|c| c.id == repo.id && c.enabled != repo.enabled);
            if changed {
                self.index.set_repository_enabled(&repo.id, repo.enabled);
            }
        }
        debug!("Restored {} repositories", self.saved.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::SnapshotIndex;

    fn index() -> SnapshotIndex {
        let mut index = SnapshotIndex::new();
        index.add_repository("base", true);
        index.add_repository("extra", false);
        index.add_repository("extra-debuginfo", false);
        index
    }

    fn enabled(index: &dyn PackageIndex, id: &str) -> bool {
        index
            .repositories()
            .iter()
            .any(|r| r.id == id && r.enabled)
    }

    #[test]
    fn test_request_decode() {
        let json = r#"{"provides":"foo","version":"1.*","repos":[{"enable":"extra"},{"disable":"base"}]}"#;
        let req: PackageMatchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.provides, "foo");
        assert_eq!(req.version.as_deref(), Some("1.*"));
        assert!(req.arch.is_none());
        assert_eq!(
            req.repos,
            vec![
                RepoOverride::Enable("extra".to_string()),
                RepoOverride::Disable("base".to_string())
            ]
        );
    }

    #[test]
    fn test_request_classification() {
        assert!(PackageMatchRequest::new("foo >= 1.2").is_expression());
        assert!(!PackageMatchRequest::new("foo").is_expression());
        assert!(!PackageMatchRequest::new("foo").has_nevra_fields());
        assert!(PackageMatchRequest::new("foo").with_arch("x86_64").has_nevra_fields());
        assert_eq!(PackageMatchRequest::new("foo >= 1.2").name_token(), "foo");

        // An empty string is the same as an absent field
        let mut req = PackageMatchRequest::new("foo");
        req.version = Some(String::new());
        assert!(!req.has_nevra_fields());
    }

    #[test]
    fn test_scope_restores_state() {
        let mut index = index();
        {
            let overrides = vec![
                RepoOverride::Enable("extra*".to_string()),
                RepoOverride::Disable("base".to_string()),
            ];
            let scope = RepoScope::apply(&mut index, &overrides);
            assert!(enabled(scope.index(), "extra"));
            assert!(enabled(scope.index(), "extra-debuginfo"));
            assert!(!enabled(scope.index(), "base"));
        }
        assert!(enabled(&index, "base"));
        assert!(!enabled(&index, "extra"));
        assert!(!enabled(&index, "extra-debuginfo"));
    }

    #[test]
    fn test_overrides_apply_in_order() {
        let mut index = index();
        let overrides = vec![
            RepoOverride::Enable("*".to_string()),
            RepoOverride::Disable("extra-debuginfo".to_string()),
        ];
        let scope = RepoScope::apply(&mut index, &overrides);
        assert!(enabled(scope.index(), "extra"));
        assert!(!enabled(scope.index(), "extra-debuginfo"));
    }
}
