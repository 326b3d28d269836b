//! Package atoms
//!
//! The package column of a package.* entry is a Gentoo atom:
//! - `category/package`
//! - `>=category/package-1.0`
//! - `=category/package-1.0*`
//! - `category/package:slot::repository`
//!
//! Users may also type a bare `package`, which is completed to
//! `category/package` by a [`crate::PackageExpander`].

use crate::{ConfigError, Result};
use std::fmt;
use std::str::FromStr;

/// Version comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersionOp {
    #[default]
    Any,
    Equal,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    /// `=category/package-1.0*`
    GlobEqual,
    /// `~category/package-1.0`, any revision
    RevisionBump,
}

impl VersionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Equal | Self::GlobEqual => "=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::RevisionBump => "~",
        }
    }

    /// Split the operator off the front of an atom
    fn split(s: &str) -> (Self, &str) {
        for (prefix, op) in [
            (">=", Self::GreaterEqual),
            ("<=", Self::LessEqual),
            (">", Self::Greater),
            ("<", Self::Less),
            ("~", Self::RevisionBump),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return (op, rest);
            }
        }
        match s.strip_prefix('=') {
            Some(rest) if rest.ends_with('*') => (Self::GlobEqual, rest),
            Some(rest) => (Self::Equal, rest),
            None => (Self::Any, s),
        }
    }
}

/// A package atom; the category is missing for bare names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageAtom {
    pub operator: VersionOp,
    pub category: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub slot: Option<String>,
    pub repository: Option<String>,
}

impl PackageAtom {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            operator: VersionOp::Any,
            category: Some(category.into()),
            name: name.into(),
            version: None,
            slot: None,
            repository: None,
        }
    }

    /// The same atom in another category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// `category/name`, if the category is known
    pub fn cpn(&self) -> Option<String> {
        self.category
            .as_ref()
            .map(|c| format!("{}/{}", c, self.name))
    }

    /// `*/*`, `dev-libs/*` and similar
    pub fn is_wildcard(&self) -> bool {
        self.name.contains('*') || self.category.as_deref().map_or(false, |c| c.contains('*'))
    }
}

impl FromStr for PackageAtom {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::InvalidAtom("empty atom".to_string()));
        }

        let (operator, mut remaining) = VersionOp::split(s);

        let mut repository = None;
        if let Some((rest, repo)) = remaining.split_once("::") {
            repository = Some(repo.to_string());
            remaining = rest;
        }

        let mut slot = None;
        if let Some((rest, s)) = remaining.split_once(':') {
            slot = Some(s.to_string());
            remaining = rest;
        }

        if operator == VersionOp::GlobEqual {
            remaining = remaining.strip_suffix('*').unwrap_or(remaining);
        }

        let (category, name_version) = match remaining.split_once('/') {
            Some((category, rest)) => (Some(category.to_string()), rest),
            None => (None, remaining),
        };

        // the version starts at the last "-<digit>"
        let (name, version) = match operator {
            VersionOp::Any => (name_version.to_string(), None),
            _ => match version_start(name_version) {
                Some(idx) => (
                    name_version[..idx].to_string(),
                    Some(name_version[idx + 1..].to_string()),
                ),
                None => {
                    return Err(ConfigError::InvalidAtom(format!(
                        "operator without version: {}",
                        s
                    )))
                }
            },
        };

        if name.is_empty() || category.as_deref() == Some("") || name.contains('/') {
            return Err(ConfigError::InvalidAtom(format!("invalid atom: {}", s)));
        }

        Ok(Self {
            operator,
            category,
            name,
            version,
            slot,
            repository,
        })
    }
}

fn version_start(name_version: &str) -> Option<usize> {
    let bytes = name_version.as_bytes();
    (0..bytes.len().saturating_sub(1))
        .rev()
        .find(|&i| bytes[i] == b'-' && bytes[i + 1].is_ascii_digit())
}

impl fmt::Display for PackageAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operator.as_str())?;
        if let Some(ref category) = self.category {
            write!(f, "{}/", category)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref ver) = self.version {
            write!(f, "-{}", ver)?;
        }
        if self.operator == VersionOp::GlobEqual {
            write!(f, "*")?;
        }
        if let Some(ref slot) = self.slot {
            write!(f, ":{}", slot)?;
        }
        if let Some(ref repo) = self.repository {
            write!(f, "::{}", repo)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_atom() {
        let atom: PackageAtom = "sys-apps/systemd".parse().unwrap();
        assert_eq!(atom.category.as_deref(), Some("sys-apps"));
        assert_eq!(atom.name, "systemd");
        assert_eq!(atom.operator, VersionOp::Any);
        assert_eq!(atom.cpn().as_deref(), Some("sys-apps/systemd"));
    }

    #[test]
    fn test_parse_bare_name() {
        let atom: PackageAtom = "systemd".parse().unwrap();
        assert_eq!(atom.category, None);
        assert_eq!(atom.cpn(), None);
        assert_eq!(
            atom.with_category("sys-apps").to_string(),
            "sys-apps/systemd"
        );
    }

    #[test]
    fn test_parse_versioned_atom() {
        let atom: PackageAtom = ">=dev-libs/libfoo-2-1.0:0::gentoo".parse().unwrap();
        assert_eq!(atom.name, "libfoo-2");
        assert_eq!(atom.version.as_deref(), Some("1.0"));
        assert_eq!(atom.slot.as_deref(), Some("0"));
        assert_eq!(atom.repository.as_deref(), Some("gentoo"));
        assert_eq!(atom.to_string(), ">=dev-libs/libfoo-2-1.0:0::gentoo");
    }

    #[test]
    fn test_glob_version() {
        let atom: PackageAtom = "=dev-lang/python-3.11*".parse().unwrap();
        assert_eq!(atom.operator, VersionOp::GlobEqual);
        assert_eq!(atom.version.as_deref(), Some("3.11"));
        assert_eq!(atom.to_string(), "=dev-lang/python-3.11*");
    }

    #[test]
    fn test_wildcards() {
        assert!("*/*".parse::<PackageAtom>().unwrap().is_wildcard());
        assert!("dev-libs/*".parse::<PackageAtom>().unwrap().is_wildcard());
        assert!(!"dev-libs/foo".parse::<PackageAtom>().unwrap().is_wildcard());
    }

    #[test]
    fn test_invalid_atoms() {
        assert!(matches!(
            "".parse::<PackageAtom>(),
            Err(ConfigError::InvalidAtom(_))
        ));
        assert!(matches!(
            ">=dev-libs/foo".parse::<PackageAtom>(),
            Err(ConfigError::InvalidAtom(_))
        ));
        assert!(matches!(
            "/foo".parse::<PackageAtom>(),
            Err(ConfigError::InvalidAtom(_))
        ));
        assert!(matches!(
            "a/b/c".parse::<PackageAtom>(),
            Err(ConfigError::InvalidAtom(_))
        ));
    }
}
