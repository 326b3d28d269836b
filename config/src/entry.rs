//! Declaration lines
//!
//! A package.* file is a sequence of lines. Lines that declare something
//! (`category/name flag -flag # comment`) become [`PackageEntry`] values;
//! everything else (blank lines, comments, anything we do not understand)
//! is kept verbatim as [`Line::Inert`].
//!
//! An entry remembers the exact text it was parsed from and reproduces it
//! unchanged until it is modified.

use crate::{ConfigError, Flag, Result};
use std::fmt;
use std::sync::OnceLock;

/// In-line comments start with `#` following whitespace
fn comment_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\s#.*$").expect("valid comment regex"))
}

/// One line of a declaration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Blank or comment line, preserved as-is
    Inert(String),
    /// A package declaration
    Entry(PackageEntry),
}

impl Line {
    /// Classify a raw line (including its newline, if any)
    pub fn parse(line: &str) -> Self {
        match PackageEntry::parse(line) {
            Ok(entry) => Self::Entry(entry),
            Err(_) => Self::Inert(line.to_string()),
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            Self::Inert(_) => false,
            Self::Entry(e) => e.is_modified(),
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inert(s) => f.write_str(s),
            Self::Entry(e) => fmt::Display::fmt(e, f),
        }
    }
}

/// A package declaration line decomposed into flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// Package identifier, kept opaque
    pub package: String,
    flags: Vec<Flag>,
    raw: String,
    modified: bool,
    /// Inert lines directly above this entry
    pub leading: Vec<String>,
    trailing_comment: String,
}

impl PackageEntry {
    /// Parse a declaration line
    ///
    /// Returns [`ConfigError::InvalidEntry`] for blank and comment lines.
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let package = match tokens.next() {
            Some(t) if !t.starts_with('#') => t.to_string(),
            _ => return Err(ConfigError::InvalidEntry),
        };

        let flags = tokens
            .take_while(|t| !t.starts_with('#'))
            .map(Flag::parse)
            .collect();

        // rewritten lines keep the file's line terminator
        let (body, eol) = match line.strip_suffix("\r\n") {
            Some(body) => (body, "\r\n"),
            None => (line.strip_suffix('\n').unwrap_or(line), "\n"),
        };
        let trailing_comment = match comment_regex().find(body) {
            Some(m) => format!("{}{}", m.as_str(), eol),
            None => eol.to_string(),
        };

        Ok(Self {
            package,
            flags,
            raw: line.to_string(),
            modified: false,
            leading: Vec::new(),
            trailing_comment,
        })
    }

    /// Create a fresh entry for a package, marked modified
    pub fn new(package: impl Into<String>) -> Self {
        let package = package.into();
        Self {
            raw: format!("{}\n", package),
            package,
            flags: Vec::new(),
            modified: true,
            leading: Vec::new(),
            trailing_comment: "\n".to_string(),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Force the entry to be re-serialized on write
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Flags in file order
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags in order of effectiveness (last on the line first)
    pub fn effective_flags(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter().rev()
    }

    /// Index of the effective occurrence of a flag
    pub fn find(&self, name: &str) -> Option<usize> {
        self.flags.iter().rposition(|f| f.name == name)
    }

    /// The effective occurrence of a flag
    pub fn get(&self, name: &str) -> Option<&Flag> {
        self.find(name).map(|i| &self.flags[i])
    }

    pub fn flag_mut(&mut self, index: usize) -> Option<&mut Flag> {
        self.flags.get_mut(index)
    }

    /// Append a flag at the end of the line
    pub fn append(&mut self, flag: Flag) -> &mut Flag {
        self.modified = true;
        self.flags.push(flag);
        let last = self.flags.len() - 1;
        &mut self.flags[last]
    }

    /// Remove every occurrence of a flag; returns whether anything was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.flags.len();
        self.flags.retain(|f| f.name != name);
        let removed = self.flags.len() != before;
        if removed {
            self.modified = true;
        }
        removed
    }

    /// Drop all negated flags
    pub fn strip_disabled(&mut self) {
        let before = self.flags.len();
        self.flags.retain(|f| !f.is_disabled());
        if self.flags.len() != before {
            self.modified = true;
        }
    }

    /// Sort flags by name, marking the entry modified only if the order changed
    pub fn sort(&mut self) {
        let mut sorted = self.flags.clone();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        if sorted != self.flags {
            self.flags = sorted;
            self.modified = true;
        }
    }

    /// Rewrite the entry as a bare package line, keeping its comment
    pub(crate) fn collapse(&mut self) {
        self.raw = format!("{}{}", self.package, self.trailing_comment);
        self.modified = false;
    }

    /// The line as it would be written (without leading context)
    pub fn render(&self) -> String {
        if !self.modified {
            return self.raw.clone();
        }
        let flags = self
            .flags
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        if flags.is_empty() {
            format!("{}{}", self.package, self.trailing_comment)
        } else {
            format!("{} {}{}", self.package, flags, self.trailing_comment)
        }
    }
}

impl fmt::Display for PackageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
