//! Tool settings
//!
//! Settings are read from a TOML file:
//!
//! ```toml
//! config_root = "/etc/portage"
//! repositories = ["/var/db/repos/gentoo"]
//! accept_keywords = ["amd64"]
//! default_file_name = "pkgflags"
//! ```
//!
//! Every field is optional. Command-line options override them.

use crate::{ConfigError, Result, DEFAULT_FILE_NAME};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration paths
pub mod paths {
    use std::path::PathBuf;

    /// Portage configuration root
    pub fn config_root() -> PathBuf {
        PathBuf::from("/etc/portage")
    }

    /// Settings file of this tool
    pub fn settings() -> PathBuf {
        PathBuf::from("/etc/pkgflags.toml")
    }

    /// Repositories tried when none is configured
    pub fn repositories() -> Vec<PathBuf> {
        vec![
            PathBuf::from("/var/db/repos/gentoo"),
            PathBuf::from("/usr/portage"),
        ]
    }
}

/// Environment variable names
pub mod env_vars {
    /// Settings file override
    pub const CONFIG: &str = "PKGFLAGS_CONFIG";
    /// Repository override
    pub const REPO: &str = "PKGFLAGS_REPO";
    /// Portage compatibility variable
    pub const PORTAGE_CONFIGROOT: &str = "PORTAGE_CONFIGROOT";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the package.* files
    pub config_root: PathBuf,
    /// Ebuild repositories used for flag and keyword metadata
    pub repositories: Vec<PathBuf>,
    /// Globally accepted keywords; read from make.conf when empty
    pub accept_keywords: Vec<String>,
    /// File created when a package.* directory is empty
    pub default_file_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_root: paths::config_root(),
            repositories: Vec::new(),
            accept_keywords: Vec::new(),
            default_file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let settings: Self = toml::from_str(&content)?;
        debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load from a TOML file, defaulting when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn make_conf(&self) -> PathBuf {
        self.config_root.join("make.conf")
    }

    /// Globally accepted keywords
    ///
    /// Falls back to `ACCEPT_KEYWORDS` in make.conf, then to the host
    /// architecture.
    pub fn effective_accept_keywords(&self) -> Result<Vec<String>> {
        if !self.accept_keywords.is_empty() {
            return Ok(self.accept_keywords.clone());
        }

        let make_conf = self.make_conf();
        match std::fs::read_to_string(&make_conf) {
            Ok(content) => {
                if let Some(value) = make_conf_var(&content, "ACCEPT_KEYWORDS") {
                    let keywords = split_words(&value);
                    if !keywords.is_empty() {
                        return Ok(keywords);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ConfigError::io(make_conf, e)),
        }

        Ok(vec![detect_arch().to_string()])
    }
}

fn split_words(value: &str) -> Vec<String> {
    value.split_whitespace().map(String::from).collect()
}

/// Last assignment of a variable in a make.conf-style file
///
/// Handles `VAR="value"`, `VAR='value'`, bare values, multi-line quoted
/// values and `${VAR}` / `$VAR` references to the variable's previous value.
pub fn make_conf_var(content: &str, name: &str) -> Option<String> {
    let mut value: Option<String> = None;
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let line = line.trim();
        let line = line.strip_prefix("export ").unwrap_or(line);
        let rest = match line.strip_prefix(name).and_then(|r| r.strip_prefix('=')) {
            Some(rest) => rest,
            None => continue,
        };

        let raw = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let mut body = rest[1..].to_string();
                while !body.contains(quote) {
                    match lines.next() {
                        Some(next) => {
                            body.push(' ');
                            body.push_str(next.trim());
                        }
                        None => break,
                    }
                }
                match body.find(quote) {
                    Some(end) => body[..end].to_string(),
                    None => body,
                }
            }
            _ => rest.split('#').next().unwrap_or("").trim().to_string(),
        };

        let previous = value.clone().unwrap_or_default();
        let expanded = raw
            .replace(&format!("${{{}}}", name), &previous)
            .replace(&format!("${}", name), &previous);
        value = Some(expanded);
    }

    value
}

/// Keyword of the host architecture
pub fn detect_arch() -> &'static str {
    #[cfg(target_arch = "x86_64")]
    return "amd64";

    #[cfg(target_arch = "aarch64")]
    return "arm64";

    #[cfg(target_arch = "x86")]
    return "x86";

    #[cfg(target_arch = "arm")]
    return "arm";

    #[cfg(target_arch = "riscv64")]
    return "riscv";

    #[cfg(target_arch = "powerpc64")]
    return "ppc64";

    #[cfg(not(any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "x86",
        target_arch = "arm",
        target_arch = "riscv64",
        target_arch = "powerpc64"
    )))]
    return "unknown";
}
