// src/packages/filter.rs

//! NEVRA field filters with literal and glob matching

use super::record::PackageRecord;
use glob::Pattern;

/// Check if a value should be treated as a glob pattern
pub fn has_glob_chars(value: &str) -> bool {
    value.contains(['*', '?', '[', ']'])
}

/// A single field constraint: exact text or a glob pattern
#[derive(Debug, Clone)]
pub enum FieldMatch {
    Exact(String),
    Glob(Pattern),
}

impl FieldMatch {
    /// Build a matcher, using a glob only when the value contains glob syntax
    ///
    /// A value with glob characters that is not a valid pattern (an
    /// unbalanced `[`) falls back to exact matching.
    pub fn new(value: &str) -> Self {
        if has_glob_chars(value)
            && let Ok(pattern) = Pattern::new(value)
        {
            return FieldMatch::Glob(pattern);
        }
        FieldMatch::Exact(value.to_string())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            FieldMatch::Exact(expected) => expected == value,
            FieldMatch::Glob(pattern) => pattern.matches(value),
        }
    }

    pub fn is_glob(&self) -> bool {
        matches!(self, FieldMatch::Glob(_))
    }
}

/// Filter over package records; unset fields match anything
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    pub name: Option<FieldMatch>,
    pub epoch: Option<FieldMatch>,
    pub version: Option<FieldMatch>,
    pub release: Option<FieldMatch>,
    pub arch: Option<FieldMatch>,
    /// Matched against every [`PackageRecord::nevra_forms`] spelling
    pub nevra: Option<FieldMatch>,
}

impl PackageFilter {
    /// A filter matching every package
    pub fn all() -> Self {
        Self::default()
    }

    pub fn name(mut self, value: &str) -> Self {
        self.name = Some(FieldMatch::new(value));
        self
    }

    pub fn epoch(mut self, value: &str) -> Self {
        self.epoch = Some(FieldMatch::new(value));
        self
    }

    pub fn version(mut self, value: &str) -> Self {
        self.version = Some(FieldMatch::new(value));
        self
    }

    pub fn release(mut self, value: &str) -> Self {
        self.release = Some(FieldMatch::new(value));
        self
    }

    pub fn arch(mut self, value: &str) -> Self {
        self.arch = Some(FieldMatch::new(value));
        self
    }

    /// Match a combined `name-version-release.arch` style string
    pub fn nevra(mut self, value: &str) -> Self {
        self.nevra = Some(FieldMatch::new(value));
        self
    }

    /// Check every set field against the record
    pub fn matches(&self, pkg: &PackageRecord) -> bool {
        let check = |field: &Option<FieldMatch>, value: &str| {
            field.as_ref().is_none_or(|m| m.matches(value))
        };

        check(&self.name, &pkg.name)
            && check(&self.epoch, &pkg.epoch)
            && check(&self.version, &pkg.version)
            && check(&self.release, &pkg.release)
            && check(&self.arch, &pkg.arch)
            && self
                .nevra
                .as_ref()
                .is_none_or(|m| pkg.nevra_forms().iter().any(|form| m.matches(form)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::record::Origin;

    fn pkg() -> PackageRecord {
        PackageRecord::new("zabbix-agent", "0", "4.0.15", "1.fc31", "x86_64", Origin::Available)
    }

    #[test]
    fn test_glob_detection() {
        assert!(has_glob_chars("4.0.*"));
        assert!(has_glob_chars("x86_6?"));
        assert!(has_glob_chars("[a-z]*"));
        assert!(!has_glob_chars("4.0.15"));
        assert!(FieldMatch::new("4.*").is_glob());
        assert!(!FieldMatch::new("4.0").is_glob());
    }

    #[test]
    fn test_invalid_glob_falls_back_to_exact() {
        let m = FieldMatch::new("foo[");
        assert!(!m.is_glob());
        assert!(m.matches("foo["));
    }

    #[test]
    fn test_filter_literal_fields() {
        let filter = PackageFilter::all()
            .name("zabbix-agent")
            .version("4.0.15")
            .arch("x86_64");
        assert!(filter.matches(&pkg()));

        let filter = PackageFilter::all().name("zabbix-agent").version("4.0");
        assert!(!filter.matches(&pkg()));
    }

    #[test]
    fn test_filter_glob_fields() {
        let filter = PackageFilter::all().name("zabbix-*").version("4.0.*").release("*.fc31");
        assert!(filter.matches(&pkg()));

        let filter = PackageFilter::all().name("zabbix-*").arch("i?86");
        assert!(!filter.matches(&pkg()));
    }

    #[test]
    fn test_filter_combined_nevra() {
        for spelling in [
            "zabbix-agent-4.0.15",
            "zabbix-agent-4.0.15-1.fc31",
            "zabbix-agent-4.0.15-1.fc31.x86_64",
            "zabbix-agent-0:4.0.15-1.fc31.x86_64",
            "0:zabbix-agent-4.0.15-1.fc31.x86_64",
            "zabbix-agent-4.0*",
        ] {
            assert!(PackageFilter::all().nevra(spelling).matches(&pkg()), "{}", spelling);
        }
        assert!(!PackageFilter::all().nevra("zabbix-agent-4.0").matches(&pkg()));
        assert!(!PackageFilter::all().nevra("zabbix-agent-4.0.15-1.fc31.i686").matches(&pkg()));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(PackageFilter::all().matches(&pkg()));
    }
}
