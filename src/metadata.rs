//! Flag and keyword metadata read from ebuild repositories
//!
//! Global values come from the repository profiles:
//! - `profiles/use.desc`: `flag - description`
//! - `profiles/desc/<var>.desc`: USE_EXPAND values, as `<var>_<value>`
//! - `profiles/arch.list`: one keyword per line
//!
//! Per-package values come from the metadata cache
//! (`metadata/md5-cache/<category>/<name>-<version>`), unioned over all
//! versions.

use config::{
    ConfigError, MetadataProvider, Namespace, PackageAtom, PackageExpander, Result,
};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct RepositoryMetadata {
    repositories: Vec<PathBuf>,
}

impl RepositoryMetadata {
    pub fn new(repositories: Vec<PathBuf>) -> Self {
        Self { repositories }
    }

    pub fn repositories(&self) -> &[PathBuf] {
        &self.repositories
    }

    fn use_flags(&self, repo: &Path) -> Result<BTreeSet<String>> {
        let mut flags = BTreeSet::new();
        if let Some(content) = read_optional(&repo.join("profiles/use.desc"))? {
            flags.extend(description_names(&content));
        }

        let desc_dir = repo.join("profiles/desc");
        let entries = match fs::read_dir(&desc_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(flags),
            Err(e) => return Err(ConfigError::io(desc_dir, e)),
        };
        for entry in entries {
            let path = entry.map_err(|e| ConfigError::io(&desc_dir, e))?.path();
            if path.extension().map_or(true, |ext| ext != "desc") {
                continue;
            }
            let prefix = match path.file_stem() {
                Some(stem) => stem.to_string_lossy().to_lowercase(),
                None => continue,
            };
            if let Some(content) = read_optional(&path)? {
                flags.extend(
                    description_names(&content).map(|name| format!("{}_{}", prefix, name)),
                );
            }
        }
        Ok(flags)
    }

    fn keywords(&self, repo: &Path) -> Result<BTreeSet<String>> {
        let content = read_optional(&repo.join("profiles/arch.list"))?.unwrap_or_default();
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect())
    }

    /// Cache entries of every version of a package
    fn cache_entries(&self, repo: &Path, atom: &PackageAtom) -> Result<Vec<PathBuf>> {
        let category = match atom.category.as_deref() {
            Some(category) => category,
            None => return Ok(Vec::new()),
        };
        let dir = repo.join("metadata/md5-cache").join(category);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConfigError::io(dir, e)),
        };

        let prefix = format!("{}-", atom.name);
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::io(&dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_version = name
                .strip_prefix(&prefix)
                .and_then(|v| v.chars().next())
                .map_or(false, |c| c.is_ascii_digit());
            if is_version {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }

    /// Categories that contain a package of this name
    fn categories_of(&self, name: &str) -> Result<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        for repo in &self.repositories {
            let listed = read_optional(&repo.join("profiles/categories"))?.unwrap_or_default();
            for category in listed.lines().map(str::trim) {
                if category.is_empty() || category.starts_with('#') {
                    continue;
                }
                if repo.join(category).join(name).is_dir() {
                    found.insert(category.to_string());
                }
            }
        }
        Ok(found)
    }
}

impl MetadataProvider for RepositoryMetadata {
    fn global_values(&self, ns: &Namespace) -> Result<BTreeSet<String>> {
        let mut values = BTreeSet::new();
        for repo in &self.repositories {
            match ns {
                Namespace::Use => values.extend(self.use_flags(repo)?),
                Namespace::Keywords => values.extend(self.keywords(repo)?),
                _ => {}
            }
        }
        debug!("{} global {} values", values.len(), ns);
        Ok(values)
    }

    fn package_values(&self, ns: &Namespace, package: &str) -> Result<BTreeSet<String>> {
        let key = match ns {
            Namespace::Use => "IUSE=",
            Namespace::Keywords => "KEYWORDS=",
            _ => return Ok(BTreeSet::new()),
        };
        let atom: PackageAtom = package.parse()?;

        let mut values = BTreeSet::new();
        for repo in &self.repositories {
            for path in self.cache_entries(repo, &atom)? {
                let content = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
                for line in content.lines() {
                    if let Some(value) = line.strip_prefix(key) {
                        values.extend(value.split_whitespace().map(String::from));
                    }
                }
            }
        }
        Ok(values)
    }
}

impl PackageExpander for RepositoryMetadata {
    fn expand(&self, name: &str) -> Result<String> {
        let atom: PackageAtom = name.parse()?;
        if atom.category.is_some() || atom.is_wildcard() {
            return Ok(atom.to_string());
        }

        let categories = self.categories_of(&atom.name)?;
        let mut iter = categories.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Err(ConfigError::UnknownCategory(name.to_string())),
            (Some(category), None) => {
                let expanded = atom.clone().with_category(category.as_str()).to_string();
                debug!("Expanded {} to {}", name, expanded);
                Ok(expanded)
            }
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousPackage(
                categories
                    .iter()
                    .map(|c| format!("{}/{}", c, atom.name))
                    .collect(),
            )),
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::io(path, e)),
    }
}

/// Names from `name - description` lines
fn description_names(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once(" - ").map(|(name, _)| name.trim().to_string()))
}
