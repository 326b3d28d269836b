//! Validity oracle
//!
//! Answers "is `x` a known flag/keyword, globally or for package `P`". The
//! raw values come from a [`MetadataProvider`] (the ebuild repository in
//! the CLI, a [`StaticMetadata`] table in tests); [`FlagCache`] normalizes
//! and memoizes them for the lifetime of the process.

use crate::{Namespace, Result};
use std::collections::{BTreeSet, HashMap};

/// Source of valid flag and keyword names
pub trait MetadataProvider {
    /// Every value known in a domain (use.desc flags, arch.list keywords)
    fn global_values(&self, ns: &Namespace) -> Result<BTreeSet<String>>;

    /// Values declared by a package (IUSE, KEYWORDS), across all its versions
    fn package_values(&self, ns: &Namespace, package: &str) -> Result<BTreeSet<String>>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for &P {
    fn global_values(&self, ns: &Namespace) -> Result<BTreeSet<String>> {
        (**self).global_values(ns)
    }

    fn package_values(&self, ns: &Namespace, package: &str) -> Result<BTreeSet<String>> {
        (**self).package_values(ns, package)
    }
}

/// Lazily populated lookups over a [`MetadataProvider`]
pub struct FlagCache<P> {
    provider: P,
    global: HashMap<Namespace, BTreeSet<String>>,
    package: HashMap<(Namespace, String), BTreeSet<String>>,
}

impl<P: MetadataProvider> FlagCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            global: HashMap::new(),
            package: HashMap::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Globally valid values of a domain
    pub fn global(&mut self, ns: &Namespace) -> Result<&BTreeSet<String>> {
        if !self.global.contains_key(ns) {
            let mut values = if Namespace::ORACLE.contains(ns) {
                self.provider.global_values(ns)?
            } else {
                BTreeSet::new()
            };
            if *ns == Namespace::Keywords {
                let testing: Vec<String> = values.iter().map(|k| format!("~{}", k)).collect();
                values.extend(testing);
                values.insert("**".to_string());
            }
            self.global.insert(ns.clone(), values);
        }
        Ok(&self.global[ns])
    }

    /// Values valid for one package
    pub fn package(&mut self, ns: &Namespace, package: &str) -> Result<&BTreeSet<String>> {
        let key = (ns.clone(), package.to_string());
        if !self.package.contains_key(&key) {
            let mut values = if Namespace::ORACLE.contains(ns) {
                self.provider.package_values(ns, package)?
            } else {
                BTreeSet::new()
            };
            match ns {
                // IUSE carries +/- defaults
                Namespace::Use => {
                    values = values
                        .into_iter()
                        .map(|v| v.trim_start_matches(['+', '-']).to_string())
                        .collect();
                }
                Namespace::Keywords => {
                    values.insert("**".to_string());
                }
                _ => {}
            }
            self.package.insert(key.clone(), values);
        }
        Ok(&self.package[&key])
    }

    /// Domains in which `arg` is a globally known value
    pub fn glob_whatis(
        &mut self,
        arg: &str,
        restrict: Option<&BTreeSet<Namespace>>,
    ) -> Result<BTreeSet<Namespace>> {
        let mut found = BTreeSet::new();
        for ns in candidates(restrict) {
            if self.global(&ns)?.contains(arg) {
                found.insert(ns);
            }
        }
        Ok(found)
    }

    /// Domains in which `arg` is a known value for `package`
    pub fn whatis(
        &mut self,
        arg: &str,
        package: &str,
        restrict: Option<&BTreeSet<Namespace>>,
    ) -> Result<BTreeSet<Namespace>> {
        let mut found = BTreeSet::new();
        for ns in candidates(restrict) {
            if self.package(&ns, package)?.contains(arg) {
                found.insert(ns);
            }
        }
        Ok(found)
    }
}

fn candidates(restrict: Option<&BTreeSet<Namespace>>) -> Vec<Namespace> {
    Namespace::ORACLE
        .iter()
        .filter(|ns| restrict.map_or(true, |r| r.contains(*ns)))
        .cloned()
        .collect()
}

/// In-memory metadata
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    global: HashMap<Namespace, BTreeSet<String>>,
    package: HashMap<(Namespace, String), BTreeSet<String>>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add globally known values
    pub fn with_global<I, S>(mut self, ns: Namespace, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global
            .entry(ns)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Add values declared by a package
    pub fn with_package<I, S>(mut self, ns: Namespace, package: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.package
            .entry((ns, package.to_string()))
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }
}

impl MetadataProvider for StaticMetadata {
    fn global_values(&self, ns: &Namespace) -> Result<BTreeSet<String>> {
        Ok(self.global.get(ns).cloned().unwrap_or_default())
    }

    fn package_values(&self, ns: &Namespace, package: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .package
            .get(&(ns.clone(), package.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<usize>,
    }

    impl MetadataProvider for CountingProvider {
        fn global_values(&self, _ns: &Namespace) -> Result<BTreeSet<String>> {
            self.calls.set(self.calls.get() + 1);
            Ok(["amd64".to_string()].into_iter().collect())
        }

        fn package_values(&self, _ns: &Namespace, _package: &str) -> Result<BTreeSet<String>> {
            self.calls.set(self.calls.get() + 1);
            Ok(["+ssl".to_string(), "-X".to_string()].into_iter().collect())
        }
    }

    #[test]
    fn test_lookups_are_cached() {
        let mut cache = FlagCache::new(CountingProvider {
            calls: Cell::new(0),
        });
        cache.global(&Namespace::Keywords).unwrap();
        cache.global(&Namespace::Keywords).unwrap();
        cache.package(&Namespace::Use, "dev-libs/foo").unwrap();
        cache.package(&Namespace::Use, "dev-libs/foo").unwrap();
        assert_eq!(cache.provider().calls.get(), 2);
    }

    #[test]
    fn test_keyword_normalization() {
        let mut cache = FlagCache::new(CountingProvider {
            calls: Cell::new(0),
        });
        let global = cache.global(&Namespace::Keywords).unwrap();
        assert!(global.contains("amd64"));
        assert!(global.contains("~amd64"));
        assert!(global.contains("**"));

        let pkg = cache.package(&Namespace::Keywords, "dev-libs/foo").unwrap();
        assert!(pkg.contains("**"));
    }

    #[test]
    fn test_iuse_defaults_are_stripped() {
        let mut cache = FlagCache::new(CountingProvider {
            calls: Cell::new(0),
        });
        let pkg = cache.package(&Namespace::Use, "dev-libs/foo").unwrap();
        assert!(pkg.contains("ssl"));
        assert!(pkg.contains("X"));
    }

    #[test]
    fn test_domains_without_metadata() {
        let mut cache = FlagCache::new(CountingProvider {
            calls: Cell::new(0),
        });
        assert!(cache.global(&Namespace::License).unwrap().is_empty());
        assert!(cache.package(&Namespace::Env, "a/b").unwrap().is_empty());
        assert_eq!(cache.provider().calls.get(), 0);
    }

    #[test]
    fn test_whatis_and_restrict() {
        let meta = StaticMetadata::new()
            .with_global(Namespace::Use, ["doc"])
            .with_global(Namespace::Keywords, ["doc"])
            .with_package(Namespace::Use, "a/b", ["ssl"]);
        let mut cache = FlagCache::new(meta);

        let both = cache.glob_whatis("doc", None).unwrap();
        assert_eq!(both.len(), 2);

        let restrict: BTreeSet<Namespace> = [Namespace::Use].into_iter().collect();
        let only_use = cache.glob_whatis("doc", Some(&restrict)).unwrap();
        assert_eq!(only_use, restrict);

        let found = cache.whatis("ssl", "a/b", None).unwrap();
        assert_eq!(found, restrict);
        assert!(cache.whatis("ssl", "c/d", None).unwrap().is_empty());
    }
}
