//! The package.* files under one configuration root

use crate::{ConfigError, FileSetKind, Namespace, PackageFileSet, Result};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Legacy keyword file, migrated into [`ACCEPT_KEYWORDS_FILE`]
pub const LEGACY_KEYWORDS_FILE: &str = "package.keywords";
pub const ACCEPT_KEYWORDS_FILE: &str = "package.accept_keywords";
pub const USE_FILE: &str = "package.use";
pub const LICENSE_FILE: &str = "package.license";
pub const ENV_FILE: &str = "package.env";

/// Keywords implied by a bare package.accept_keywords entry
///
/// Every stable keyword accepted globally becomes its testing form, e.g.
/// `ACCEPT_KEYWORDS="amd64"` gives `~amd64`.
pub fn default_keywords<S: AsRef<str>>(accept_keywords: &[S]) -> BTreeSet<String> {
    accept_keywords
        .iter()
        .map(|k| k.as_ref())
        .filter(|k| !k.is_empty() && !k.starts_with('~') && !k.starts_with('-'))
        .map(|k| format!("~{}", k))
        .collect()
}

/// One file set per domain
#[derive(Debug)]
pub struct PackageFiles {
    root: PathBuf,
    sets: IndexMap<Namespace, PackageFileSet>,
}

impl PackageFiles {
    /// File sets for `config_root` (usually /etc/portage)
    pub fn new<S: AsRef<str>>(config_root: impl Into<PathBuf>, accept_keywords: &[S]) -> Self {
        let root = config_root.into();
        let mut files = Self {
            root: root.clone(),
            sets: IndexMap::new(),
        };

        files.insert(PackageFileSet::new(Namespace::Use, vec![root.join(USE_FILE)]));
        files.insert(PackageFileSet::keywords(
            vec![root.join(LEGACY_KEYWORDS_FILE), root.join(ACCEPT_KEYWORDS_FILE)],
            default_keywords(accept_keywords),
        ));
        files.insert(PackageFileSet::new(
            Namespace::License,
            vec![root.join(LICENSE_FILE)],
        ));
        files.insert(PackageFileSet::env(root.join(ENV_FILE)));
        files
    }

    /// Use another file name for new files in empty domain directories
    pub fn with_default_file_name(mut self, name: &str) -> Self {
        self.sets = self
            .sets
            .into_iter()
            .map(|(ns, set)| (ns, set.with_default_file_name(name)))
            .collect();
        self
    }

    /// Add or replace the file set of a domain
    pub fn insert(&mut self, set: PackageFileSet) {
        self.sets.insert(set.namespace().clone(), set);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, ns: &Namespace) -> Option<&PackageFileSet> {
        self.sets.get(ns)
    }

    /// File set of a domain
    pub fn get_mut(&mut self, ns: &Namespace) -> Result<&mut PackageFileSet> {
        self.sets
            .get_mut(ns)
            .ok_or_else(|| ConfigError::UnknownNamespace(ns.to_string()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PackageFileSet> {
        self.sets.values_mut()
    }

    /// Default keywords of the keyword domain
    pub fn default_keywords(&self) -> Option<&BTreeSet<String>> {
        match self.sets.get(&Namespace::Keywords)?.kind() {
            FileSetKind::Keywords { defaults } => Some(defaults),
            _ => None,
        }
    }

    pub fn migrate(&mut self) -> Result<()> {
        for set in self.iter_mut() {
            set.migrate()?;
        }
        Ok(())
    }

    pub fn sort(&mut self) -> Result<()> {
        for set in self.iter_mut() {
            set.sort()?;
        }
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.sets.values().any(|s| s.is_modified())
    }

    /// Write every domain; a failure leaves earlier domains written
    pub fn write(&mut self) -> Result<()> {
        for set in self.iter_mut() {
            set.write()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keywords() {
        let defaults = default_keywords(&["amd64", "~x86", "-arm", ""]);
        assert_eq!(defaults, ["~amd64".to_string()].into_iter().collect());
    }

    #[test]
    fn test_domains_and_paths() {
        let files = PackageFiles::new("/etc/portage", &["amd64"]);
        let kw = files.get(&Namespace::Keywords).unwrap();
        assert_eq!(
            kw.paths(),
            &[
                PathBuf::from("/etc/portage/package.keywords"),
                PathBuf::from("/etc/portage/package.accept_keywords"),
            ]
        );
        assert_eq!(
            files.get(&Namespace::Env).unwrap().kind(),
            &FileSetKind::Env
        );
        assert!(files.default_keywords().unwrap().contains("~amd64"));
        assert!(files.get(&Namespace::Other("mask".into())).is_none());
    }

    #[test]
    fn test_unknown_namespace() {
        let mut files = PackageFiles::new("/etc/portage", &["amd64"]);
        let err = files.get_mut(&Namespace::Other("mask".into())).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownNamespace(ns) if ns == "mask"));
    }
}
