//! Directive batches
//!
//! A command line is split into batches: one or more packages followed by
//! the directives that apply to them. Directives of the same kind and
//! domain are merged, and a batch always runs enable, disable, reset and
//! output in that order.

use crate::{
    Action, ActionKind, ConfigError, FlagCache, MetadataProvider, Namespace, PackageFiles,
    RawAction, Result,
};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::debug;

/// Turns a user-typed package name into the identifier written to files
pub trait PackageExpander {
    fn expand(&self, name: &str) -> Result<String>;
}

/// Uses package names exactly as given
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl PackageExpander for Verbatim {
    fn expand(&self, name: &str) -> Result<String> {
        Ok(name.to_string())
    }
}

/// Packages and the directives to run on them
#[derive(Debug, Clone, Default)]
pub struct ActionSet {
    packages: Vec<String>,
    actions: BTreeMap<(ActionKind, Namespace), Action>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Directives in execution order
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn push_package(&mut self, package: impl Into<String>) {
        self.packages.push(package.into());
    }

    /// Resolve a directive against the packages added so far and add it
    pub fn push<P: MetadataProvider>(
        &mut self,
        raw: RawAction,
        cache: &mut FlagCache<P>,
    ) -> Result<()> {
        let action = raw.clarify(&self.packages, cache)?;
        self.insert(action);
        Ok(())
    }

    /// Add a resolved directive, merging it into an equivalent one
    pub fn insert(&mut self, action: Action) {
        let key = (action.kind, action.ns.clone());
        match self.actions.get_mut(&key) {
            Some(existing) => existing.merge(action),
            None => {
                self.actions.insert(key, action);
            }
        }
    }

    /// Run every directive against the package files
    pub fn apply(&self, files: &mut PackageFiles, out: &mut dyn Write) -> Result<()> {
        if self.packages.is_empty() {
            return Err(ConfigError::UnsupportedGlobalAction);
        }

        for action in self.actions() {
            debug!(
                "{:?} {}::{:?} for {:?}",
                action.kind, action.ns, action.args, self.packages
            );
            let set = files.get_mut(&action.ns)?;
            action.apply(&self.packages, set, out)?;
        }
        Ok(())
    }
}

/// Split command-line tokens into batches
///
/// Every directive is resolved here, so an ambiguous or malformed token
/// fails before any file is touched.
pub fn parse_actions<P, E>(
    args: &[String],
    cache: &mut FlagCache<P>,
    expander: &E,
) -> Result<Vec<ActionSet>>
where
    P: MetadataProvider,
    E: PackageExpander + ?Sized,
{
    let mut out = Vec::new();
    let mut current = ActionSet::new();

    for (i, token) in args.iter().enumerate() {
        if token.is_empty() {
            continue;
        }

        match RawAction::parse(token).map_err(|e| e.at_argument(i, token))? {
            Some(raw) => current
                .push(raw, cache)
                .map_err(|e| e.at_argument(i, token))?,
            None => {
                if current.has_actions() {
                    out.push(std::mem::take(&mut current));
                }
                let package = expander
                    .expand(token)
                    .map_err(|e| e.at_argument(i, token))?;
                current.push_package(package);
            }
        }
    }

    if current.has_actions() {
        out.push(current);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticMetadata;
    use std::collections::BTreeSet;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn cache() -> FlagCache<StaticMetadata> {
        FlagCache::new(
            StaticMetadata::new()
                .with_global(Namespace::Use, ["a", "b"])
                .with_global(Namespace::Keywords, ["amd64"]),
        )
    }

    #[test]
    fn test_coalesce_same_kind_and_domain() {
        let sets = parse_actions(&tokens("x/y +a +b -a"), &mut cache(), &Verbatim).unwrap();
        assert_eq!(sets.len(), 1);
        let actions: Vec<&Action> = sets[0].actions().collect();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind, ActionKind::Enable);
        assert_eq!(
            actions[0].args,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert_eq!(actions[1].kind, ActionKind::Disable);
    }

    #[test]
    fn test_canonical_order() {
        let sets = parse_actions(&tokens("x/y ?a %b -a +b"), &mut cache(), &Verbatim).unwrap();
        let kinds: Vec<ActionKind> = sets[0].actions().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::Enable,
                ActionKind::Disable,
                ActionKind::Reset,
                ActionKind::Output
            ]
        );
    }

    #[test]
    fn test_domains_stay_separate() {
        let sets = parse_actions(&tokens("x/y +a +~amd64"), &mut cache(), &Verbatim).unwrap();
        let ns: Vec<Namespace> = sets[0].actions().map(|a| a.ns.clone()).collect();
        assert_eq!(ns, vec![Namespace::Use, Namespace::Keywords]);
    }

    #[test]
    fn test_batches_split_on_packages() {
        let sets = parse_actions(
            &tokens("a/a b/b +a c/c -b d/d"),
            &mut cache(),
            &Verbatim,
        )
        .unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].packages(), &["a/a", "b/b"]);
        assert_eq!(sets[1].packages(), &["c/c"]);
    }

    #[test]
    fn test_whole_package_absorbs_named() {
        let sets = parse_actions(&tokens("x/y %a %"), &mut cache(), &Verbatim).unwrap();
        let action = sets[0].actions().next().unwrap();
        assert!(action.args.is_empty());
    }

    #[test]
    fn test_error_position() {
        let err = parse_actions(&tokens("x/y +a +"), &mut cache(), &Verbatim).unwrap_err();
        assert_eq!(err.to_string(), "At argv[2]='+': + action requires an argument!");
    }

    #[test]
    fn test_global_batch_is_rejected() {
        let sets = parse_actions(&tokens("+a"), &mut cache(), &Verbatim).unwrap();
        assert_eq!(sets.len(), 1);
        let mut files = PackageFiles::new("/nonexistent", &["amd64"]);
        let err = sets[0].apply(&mut files, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedGlobalAction));
    }
}
