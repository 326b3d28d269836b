//! Flags as they appear on a declaration line

use std::fmt;

/// Prefix carried by a flag token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Modifier {
    /// Bare name (enabled)
    #[default]
    None,
    /// Explicit `+name`
    Enable,
    /// `-name`
    Disable,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Enable => "+",
            Self::Disable => "-",
        }
    }
}

/// A single flag with its modifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Flag {
    /// Modifier prefix
    pub modifier: Modifier,
    /// The flag name
    pub name: String,
}

impl Flag {
    /// Create a new bare (enabled) flag
    pub fn enabled(name: impl Into<String>) -> Self {
        Self {
            modifier: Modifier::None,
            name: name.into(),
        }
    }

    /// Create a new disabled flag
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            modifier: Modifier::Disable,
            name: name.into(),
        }
    }

    /// Parse a flag token (e.g., "-gtk", "+X" or "systemd")
    pub fn parse(s: &str) -> Self {
        if let Some(name) = s.strip_prefix('-') {
            Self {
                modifier: Modifier::Disable,
                name: name.to_string(),
            }
        } else if let Some(name) = s.strip_prefix('+') {
            Self {
                modifier: Modifier::Enable,
                name: name.to_string(),
            }
        } else {
            Self::enabled(s)
        }
    }

    /// Whether the flag is negated
    pub fn is_disabled(&self) -> bool {
        self.modifier == Modifier::Disable
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.modifier.as_str(), self.name)
    }
}
