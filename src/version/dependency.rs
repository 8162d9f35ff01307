// src/version/dependency.rs

//! Provide/require relations of the form `name OP [epoch:]version[-release]`
//!
//! A provides expression sent by the client (`foo >= 1.2`) is parsed into a
//! [`Dependency`], and each package's declared provides are parsed the same
//! way. Matching follows rpmdsCompare: the two relations overlap when the
//! partial EVR comparison and the operators agree.

use super::Evr;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Relational operator of a versioned dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Flag {
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = "<=")]
    Le,
    #[strum(to_string = "=", serialize = "==")]
    Eq,
    #[strum(to_string = ">=")]
    Ge,
    #[strum(to_string = ">")]
    Gt,
}

impl Flag {
    fn includes_equal(self) -> bool {
        matches!(self, Flag::Eq | Flag::Le | Flag::Ge)
    }
}

/// A named capability with an optional version relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<(Flag, Evr)>,
}

impl Dependency {
    /// An unversioned capability
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn versioned(name: impl Into<String>, flag: Flag, evr: Evr) -> Self {
        Self {
            name: name.into(),
            constraint: Some((flag, evr)),
        }
    }

    /// Parse a relation
    ///
    /// Examples:
    /// - "mtr >= 2:0.71-3.0" → mtr, GreaterOrEqual 2:0.71-3.0
    /// - "webserver" → webserver, any version
    ///
    /// Anything that is not exactly `name OP version` is taken as an
    /// unversioned capability named by its first word.
    pub fn parse(s: &str) -> Self {
        let parts: Vec<&str> = s.split_whitespace().collect();

        if let [name, op, version] = parts.as_slice()
            && let Ok(flag) = Flag::from_str(op)
        {
            return Self::versioned(*name, flag, Evr::parse(version));
        }

        Self::named(parts.first().copied().unwrap_or_default())
    }

    /// Check whether `provide` satisfies this requirement
    ///
    /// An unversioned relation on either side overlaps with anything of the
    /// same name.
    pub fn is_satisfied_by(&self, provide: &Dependency) -> bool {
        if self.name != provide.name {
            return false;
        }

        let (Some((req_flag, req_evr)), Some((prov_flag, prov_evr))) =
            (&self.constraint, &provide.constraint)
        else {
            return true;
        };

        match req_evr.partial_compare(prov_evr) {
            Ordering::Less => {
                matches!(req_flag, Flag::Gt | Flag::Ge) || matches!(prov_flag, Flag::Le | Flag::Lt)
            }
            Ordering::Greater => {
                matches!(req_flag, Flag::Lt | Flag::Le) || matches!(prov_flag, Flag::Ge | Flag::Gt)
            }
            Ordering::Equal => {
                (req_flag.includes_equal() && prov_flag.includes_equal())
                    || (*req_flag == Flag::Lt && *prov_flag == Flag::Lt)
                    || (*req_flag == Flag::Gt && *prov_flag == Flag::Gt)
            }
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some((flag, evr)) => write!(f, "{} {} {}", self.name, flag, evr),
            None => write!(f, "{}", self.name),
        }
    }
}
