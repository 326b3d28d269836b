//! Declaration domains
//!
//! Every directive targets one of the package.* domains. The domain tag is
//! what users type in front of `::` (`+kw::~amd64`, `%lic::`).

use std::fmt;
use std::str::FromStr;

/// A declaration domain
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    /// Feature flags (package.use)
    Use,
    /// Architecture keywords (package.accept_keywords)
    Keywords,
    /// License acceptance (package.license)
    License,
    /// Environment profiles (package.env)
    Env,
    /// Any other prefix; resolves, but has no backing files
    Other(String),
}

impl Namespace {
    /// The domains the validity oracle knows about
    pub const ORACLE: [Namespace; 2] = [Namespace::Use, Namespace::Keywords];

    /// Domain tag as typed on the command line
    pub fn as_str(&self) -> &str {
        match self {
            Self::Use => "use",
            Self::Keywords => "kw",
            Self::License => "lic",
            Self::Env => "env",
            Self::Other(s) => s,
        }
    }

    /// Human readable noun for warnings
    pub fn describe(&self) -> &str {
        match self {
            Self::Use => "flag",
            Self::Keywords => "keyword",
            Self::License => "license",
            Self::Env => "environment",
            Self::Other(s) => s,
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::Use
    }
}

impl FromStr for Namespace {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "use" => Self::Use,
            "kw" => Self::Keywords,
            "lic" => Self::License,
            "env" => Self::Env,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!("use".parse::<Namespace>().unwrap(), Namespace::Use);
        assert_eq!("kw".parse::<Namespace>().unwrap(), Namespace::Keywords);
        assert_eq!("lic".parse::<Namespace>().unwrap(), Namespace::License);
        assert_eq!("env".parse::<Namespace>().unwrap(), Namespace::Env);
    }

    #[test]
    fn test_unknown_tag_is_kept() {
        let ns: Namespace = "mask".parse().unwrap();
        assert_eq!(ns, Namespace::Other("mask".to_string()));
        assert_eq!(ns.to_string(), "mask");
    }
}
