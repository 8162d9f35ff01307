// src/version/mod.rs

//! Version handling and comparison for RPM-style package versions
//!
//! This module provides parsing of `[epoch:]version[-release]` strings into
//! an [`Evr`] triple, the segmented `rpmvercmp` comparison used to order
//! versions and releases, and the two-value compare answered by the
//! `versioncompare` request.

mod arch;
mod dependency;

pub use arch::{is_known_arch, native_arch, split_arch, KNOWN_ARCHES};
pub use dependency::{Dependency, Flag};

use std::cmp::Ordering;
use std::fmt;

/// A parsed package version with epoch, version, and release components
#[derive(Debug, Clone)]
pub struct Evr {
    pub epoch: u64,
    pub version: String,
    pub release: Option<String>,
}

impl Evr {
    pub fn new(epoch: u64, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release,
        }
    }

    /// Parse a version string
    ///
    /// Format: [epoch:]version[-release]
    /// Examples:
    /// - "1.2.3" → epoch=0, version="1.2.3", release=None
    /// - "2:1.2.3" → epoch=2, version="1.2.3", release=None
    /// - "1.2.3-4.el8" → epoch=0, version="1.2.3", release=Some("4.el8")
    /// - "1:2.3-4-5.el8" → epoch=1, version="2.3-4", release=Some("5.el8")
    ///
    /// Parsing never fails: a missing or non-numeric epoch is 0 and a string
    /// without a dash has no release.
    pub fn parse(s: &str) -> Self {
        let (epoch_str, rest) = match s.find(':') {
            Some(colon_pos) => (&s[..colon_pos], &s[colon_pos + 1..]),
            None => ("0", s),
        };

        let (version, release) = match rest.rfind('-') {
            Some(dash_pos) => {
                let release = &rest[dash_pos + 1..];
                (
                    rest[..dash_pos].to_string(),
                    (!release.is_empty()).then(|| release.to_string()),
                )
            }
            None => (rest.to_string(), None),
        };

        Self {
            epoch: parse_epoch(epoch_str),
            version,
            release,
        }
    }

    /// Compare two EVR triples: epoch, then version, then release
    ///
    /// A missing release sorts below any present release.
    pub fn compare(&self, other: &Evr) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| rpmvercmp(&self.version, &other.version))
            .then_with(|| match (&self.release, &other.release) {
                (Some(a), Some(b)) => rpmvercmp(a, b),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            })
    }

    /// Compare, treating a component missing on either side as equal
    ///
    /// Used for provide/require matching, where `2:1.2` matches `2:1.2-1`.
    pub fn partial_compare(&self, other: &Evr) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            ord => return ord,
        }

        if self.version.is_empty() || other.version.is_empty() {
            return Ordering::Equal;
        }
        match rpmvercmp(&self.version, &other.version) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match (&self.release, &other.release) {
            (Some(a), Some(b)) => rpmvercmp(a, b),
            _ => Ordering::Equal,
        }
    }

    /// Full `epoch:version-release` rendering, epoch always present
    pub fn evr_string(&self) -> String {
        match &self.release {
            Some(release) => format!("{}:{}-{}", self.epoch, self.version, release),
            None => format!("{}:{}", self.epoch, self.version),
        }
    }
}

fn parse_epoch(s: &str) -> u64 {
    s.trim().parse::<u64>().unwrap_or(0)
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

impl PartialEq for Evr {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Evr {}

impl Ord for Evr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Evr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Segmented alphanumeric comparison of two version (or release) strings
///
/// Both strings are split into maximal runs of ASCII digits and ASCII
/// letters; everything else is a separator and is skipped. Runs are
/// compared pairwise:
/// - digit runs numerically (leading zeros ignored, longer run wins)
/// - letter runs lexically by byte value
/// - a digit run always outranks a letter run
///
/// If every compared pair is equal, the string with more unprocessed
/// characters left is newer.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let (x, y) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);

    while i < x.len() && j < y.len() {
        while i < x.len() && !x[i].is_ascii_alphanumeric() {
            i += 1;
        }
        while j < y.len() && !y[j].is_ascii_alphanumeric() {
            j += 1;
        }

        if i == x.len() || j == y.len() {
            break;
        }

        let numeric = x[i].is_ascii_digit();
        let x_end = segment_end(x, i, numeric);
        let y_end = segment_end(y, j, numeric);

        // Segments of different types: numbers always win over letters
        if y_end == j {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            compare_digits(&x[i..x_end], &y[j..y_end])
        } else {
            x[i..x_end].cmp(&y[j..y_end])
        };
        if ord != Ordering::Equal {
            return ord;
        }

        i = x_end;
        j = y_end;
    }

    while i < x.len() && !x[i].is_ascii_alphanumeric() {
        i += 1;
    }
    while j < y.len() && !y[j].is_ascii_alphanumeric() {
        j += 1;
    }

    let x_left = x.len() - i;
    let y_left = y.len() - j;
    if x_left == 0 && y_left == 0 {
        // Segments matched and only the separators differed
        Ordering::Equal
    } else if x_left > y_left {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

fn segment_end(s: &[u8], start: usize, numeric: bool) -> usize {
    let mut end = start;
    while end < s.len()
        && if numeric {
            s[end].is_ascii_digit()
        } else {
            s[end].is_ascii_alphabetic()
        }
    {
        end += 1;
    }
    end
}

fn compare_digits(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn strip_leading_zeros(s: &[u8]) -> &[u8] {
    let first = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
    &s[first..]
}

/// Compare two raw version strings as the `versioncompare` request does
///
/// Either side may carry a trailing `.arch` suffix. When only one side has
/// a recognized architecture it is stripped and the values are compared as
/// plain EVRs; when both do, the EVRs are compared first and the
/// architectures break a tie lexically. A missing value on either side
/// compares equal.
pub fn compare_version_strings(a: Option<&str>, b: Option<&str>) -> Ordering {
    let (Some(a), Some(b)) = (a, b) else {
        return Ordering::Equal;
    };

    let (a_evr, a_arch) = split_arch(a);
    let (b_evr, b_arch) = split_arch(b);
    let evr_order = Evr::parse(a_evr).compare(&Evr::parse(b_evr));

    match (a_arch, b_arch) {
        (Some(a_arch), Some(b_arch)) => evr_order.then_with(|| a_arch.cmp(b_arch)),
        _ => evr_order,
    }
}

/// Map an ordering onto the -1/0/1 wire value
pub fn ordering_to_int(ord: Ordering) -> i32 {
    match ord {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evr_parse_simple() {
        let v = Evr::parse("1.5");
        assert_eq!(v.epoch, 0);
        assert_eq!(v.version, "1.5");
        assert_eq!(v.release, None);
    }

    #[test]
    fn test_evr_parse_full() {
        let v = Evr::parse("2:1.5-3.el7");
        assert_eq!(v.epoch, 2);
        assert_eq!(v.version, "1.5");
        assert_eq!(v.release, Some("3.el7".to_string()));
    }

    #[test]
    fn test_evr_parse_splits_on_last_dash() {
        let v = Evr::parse("1:2.3-4-5.el8");
        assert_eq!(v.epoch, 1);
        assert_eq!(v.version, "2.3-4");
        assert_eq!(v.release, Some("5.el8".to_string()));
    }

    #[test]
    fn test_evr_parse_odd_epochs() {
        // Some packages have versions like ":1.02.208-2.fc43" with empty epoch
        let v = Evr::parse(":1.02.208-2.fc43");
        assert_eq!(v.epoch, 0);
        assert_eq!(v.version, "1.02.208");

        let v = Evr::parse("abc:1.0");
        assert_eq!(v.epoch, 0);
        assert_eq!(v.version, "1.0");
    }

    #[test]
    fn test_evr_parse_trailing_dash_has_no_release() {
        let v = Evr::parse("1.0-");
        assert_eq!(v.version, "1.0");
        assert_eq!(v.release, None);
    }

    #[test]
    fn test_epoch_dominates() {
        assert_eq!(
            Evr::parse("1:1.0-1").compare(&Evr::parse("0:2.0-1")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_release_breaks_tie() {
        assert!(Evr::parse("1.2.3-1") < Evr::parse("1.2.3-2"));
        assert!(Evr::parse("1.2.3") < Evr::parse("1.2.3-1"));
    }

    #[test]
    fn test_rpmvercmp_numeric_segments() {
        assert_eq!(rpmvercmp("1.2", "1.10"), Ordering::Less);
        assert_eq!(rpmvercmp("1.10", "1.9"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.010", "1.10"), Ordering::Equal);
        assert_eq!(rpmvercmp("0001", "1"), Ordering::Equal);
    }

    #[test]
    fn test_rpmvercmp_letters_and_numbers() {
        // numbers always beat letters
        assert_eq!(rpmvercmp("1.1", "1.a"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.a", "1.1"), Ordering::Less);
        assert_eq!(rpmvercmp("1.20.b18.el5", "1.20.b17.el5"), Ordering::Greater);
        assert_eq!(rpmvercmp("Z", "z"), Ordering::Less);
        assert_eq!(rpmvercmp("a", "b"), Ordering::Less);
    }

    #[test]
    fn test_rpmvercmp_separators_and_leftovers() {
        assert_eq!(rpmvercmp("1.0", "1_0"), Ordering::Equal);
        assert_eq!(rpmvercmp("1.0.", "1.0"), Ordering::Equal);
        assert_eq!(rpmvercmp("1.0a", "1.0"), Ordering::Greater);
        assert_eq!(
            rpmvercmp("1.20.b18.el5.extrastuff", "1.20.b18.el5"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_partial_compare_ignores_missing_release() {
        let a = Evr::parse("2:1.2");
        let b = Evr::parse("2:1.2-1");
        assert_eq!(a.partial_compare(&b), Ordering::Equal);
        assert_ne!(a.compare(&b), Ordering::Equal);
    }

    #[test]
    fn test_compare_version_strings_nulls() {
        assert_eq!(compare_version_strings(None, Some("1.0")), Ordering::Equal);
        assert_eq!(compare_version_strings(Some("1.0"), None), Ordering::Equal);
        assert_eq!(compare_version_strings(None, None), Ordering::Equal);
    }

    #[test]
    fn test_compare_version_strings_strips_one_sided_arch() {
        assert_eq!(
            compare_version_strings(Some("1.2-3.el7.x86_64"), Some("1.2-3.el7")),
            Ordering::Equal
        );
        assert_eq!(
            compare_version_strings(Some("1.2-3.el7"), Some("1.2-4.el7.noarch")),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_version_strings_arch_tie_break() {
        assert_eq!(
            compare_version_strings(Some("1.2-3.i686"), Some("1.2-3.x86_64")),
            Ordering::Less
        );
        // EVR still dominates the architecture
        assert_eq!(
            compare_version_strings(Some("1.3-1.i686"), Some("1.2-3.x86_64")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_ordering_to_int() {
        assert_eq!(ordering_to_int(Ordering::Less), -1);
        assert_eq!(ordering_to_int(Ordering::Equal), 0);
        assert_eq!(ordering_to_int(Ordering::Greater), 1);
    }

    #[test]
    fn test_evr_display() {
        assert_eq!(Evr::parse("1.2.3").to_string(), "1.2.3");
        assert_eq!(Evr::parse("2:1.2.3-4.el8").to_string(), "2:1.2.3-4.el8");
        assert_eq!(Evr::parse("1.2.3-4").evr_string(), "0:1.2.3-4");
    }
}
