//! Directives
//!
//! A directive token is a one-character action followed by an optional
//! argument:
//!
//! - `+flag`: explicitly enable flag
//! - `-flag`: explicitly disable flag
//! - `%flag`: reset flag to the default state (remove it completely)
//! - `%`: reset all package flags (drop the package from the domain)
//! - `?flag`: print the status of a particular flag
//! - `?`: print package flags
//!
//! The argument may carry a domain prefix (`+kw::~amd64`). Without one the
//! domain is worked out from the metadata of the target packages, see
//! [`RawAction::clarify`].

use crate::{
    ConfigError, EntryId, Flag, FlagCache, MetadataProvider, Modifier, Namespace,
    PackageFileSet, Result,
};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use tracing::warn;

/// What a directive does; the declaration order is the execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Enable,
    Disable,
    Reset,
    Output,
}

impl ActionKind {
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Enable),
            '-' => Some(Self::Disable),
            '%' => Some(Self::Reset),
            '?' => Some(Self::Output),
            _ => None,
        }
    }

    pub fn prefix(&self) -> char {
        match self {
            Self::Enable => '+',
            Self::Disable => '-',
            Self::Reset => '%',
            Self::Output => '?',
        }
    }

    pub fn requires_argument(&self) -> bool {
        matches!(self, Self::Enable | Self::Disable)
    }
}

/// A directive as typed, before its domain is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAction {
    pub kind: ActionKind,
    pub arg: String,
}

impl RawAction {
    /// Parse a command-line token; `Ok(None)` means the token is not a directive
    pub fn parse(token: &str) -> Result<Option<Self>> {
        let mut chars = token.chars();
        let kind = match chars.next().and_then(ActionKind::from_prefix) {
            Some(kind) => kind,
            None => return Ok(None),
        };
        let arg = chars.as_str().to_string();
        if arg.is_empty() && kind.requires_argument() {
            return Err(ConfigError::MissingArgument(kind.prefix()));
        }
        Ok(Some(Self { kind, arg }))
    }

    /// Work out the domain of the argument
    ///
    /// An explicit `domain::` prefix is taken as-is. Otherwise the flag is
    /// looked up in the metadata of every target package (or globally when
    /// there are none); matching more than one domain is an error, matching
    /// none falls back to USE flags with a warning.
    pub fn clarify<P: MetadataProvider>(
        self,
        packages: &[String],
        cache: &mut FlagCache<P>,
    ) -> Result<Action> {
        let (prefix, name) = match self.arg.split_once("::") {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, self.arg.as_str()),
        };

        if name.is_empty() && self.kind.requires_argument() {
            return Err(ConfigError::MissingArgument(self.kind.prefix()));
        }

        let ns = match prefix {
            Some(prefix) => prefix.parse::<Namespace>().unwrap_or_default(),
            None if name.is_empty() => Namespace::Use,
            None if packages.is_empty() => {
                let found = cache.glob_whatis(name, None)?;
                match single(name, found)? {
                    Some(ns) => ns,
                    None => {
                        warn!("{} seems to be an incorrect global flag", name);
                        Namespace::Use
                    }
                }
            }
            None => {
                let mut decided: Option<Namespace> = None;
                for package in packages {
                    let restrict = decided.clone().map(|ns| BTreeSet::from([ns]));
                    let found = cache.whatis(name, package, restrict.as_ref())?;
                    let candidates: BTreeSet<Namespace> = if !found.is_empty() {
                        found.clone()
                    } else if let Some(ns) = &decided {
                        // known to this package only outside the decided domain
                        cache
                            .whatis(name, package, None)?
                            .into_iter()
                            .chain([ns.clone()])
                            .collect()
                    } else {
                        cache.glob_whatis(name, None)?
                    };

                    let ns = match single(name, candidates)? {
                        Some(ns) => {
                            if found.is_empty() {
                                warn!(
                                    "{} seems to be an incorrect {} for {}",
                                    name,
                                    ns.describe(),
                                    package
                                );
                            }
                            ns
                        }
                        None => {
                            warn!("{} seems to be an incorrect flag for {}", name, package);
                            Namespace::Use
                        }
                    };
                    decided = Some(ns);
                }
                decided.unwrap_or_default()
            }
        };

        let mut args = BTreeSet::new();
        if !name.is_empty() {
            args.insert(name.to_string());
        }
        Ok(Action {
            kind: self.kind,
            ns,
            args,
        })
    }
}

fn single(arg: &str, found: BTreeSet<Namespace>) -> Result<Option<Namespace>> {
    if found.len() > 1 {
        return Err(ConfigError::AmbiguousArgument {
            arg: arg.to_string(),
            matches: found.iter().map(|ns| ns.to_string()).collect(),
        });
    }
    Ok(found.into_iter().next())
}

/// A directive with a resolved domain
///
/// An empty argument set addresses the whole package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub ns: Namespace,
    pub args: BTreeSet<String>,
}

impl Action {
    pub fn new<I, S>(kind: ActionKind, ns: Namespace, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            ns,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Take over the arguments of an equivalent directive
    ///
    /// A whole-package directive absorbs named ones.
    pub fn merge(&mut self, other: Action) {
        if self.args.is_empty() || other.args.is_empty() {
            self.args.clear();
        } else {
            self.args.extend(other.args);
        }
    }

    /// Run the directive for every package against the domain's files
    pub fn apply(
        &self,
        packages: &[String],
        set: &mut PackageFileSet,
        out: &mut dyn Write,
    ) -> Result<()> {
        for package in packages {
            match self.kind {
                ActionKind::Enable => {
                    for arg in &self.args {
                        set_modifier(set, package, arg, Modifier::None)?;
                    }
                }
                ActionKind::Disable => {
                    for arg in &self.args {
                        set_modifier(set, package, arg, Modifier::Disable)?;
                    }
                }
                ActionKind::Reset => self.reset(package, set)?,
                ActionKind::Output => self.output(package, set, out)?,
            }
        }
        Ok(())
    }

    fn reset(&self, package: &str, set: &mut PackageFileSet) -> Result<()> {
        if self.args.is_empty() {
            return set.delete(package);
        }

        // lookup order is back to front, so removals keep later ids valid
        for id in set.lookup(package)? {
            let emptied = match set.entry_mut(id) {
                Some(entry) => {
                    for arg in &self.args {
                        entry.remove(arg);
                    }
                    entry.is_empty()
                }
                None => false,
            };
            if emptied {
                set.remove(id)?;
            }
        }
        Ok(())
    }

    fn output(&self, package: &str, set: &mut PackageFileSet, out: &mut dyn Write) -> Result<()> {
        let mut line = vec![package.to_string()];

        if self.args.is_empty() {
            let mut flags = BTreeMap::new();
            for id in set.lookup(package)? {
                if let Some(entry) = set.entry(id) {
                    for flag in entry.effective_flags() {
                        flags
                            .entry(flag.name.clone())
                            .or_insert_with(|| flag.to_string());
                    }
                }
            }
            line.extend(flags.into_values());
        } else {
            for arg in &self.args {
                let shown = effective_flag(set, package, arg)?
                    .and_then(|(id, index)| set.entry(id)?.flags().get(index))
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| format!("?{}", arg));
                line.push(shown);
            }
        }

        writeln!(out, "{}", line.join(" "))?;
        Ok(())
    }
}

/// Locate the effective occurrence of a flag for a package
fn effective_flag(
    set: &mut PackageFileSet,
    package: &str,
    name: &str,
) -> Result<Option<(EntryId, usize)>> {
    for id in set.lookup(package)? {
        if let Some(index) = set.entry(id).and_then(|e| e.find(name)) {
            return Ok(Some((id, index)));
        }
    }
    Ok(None)
}

/// Rewrite the effective occurrence of a flag, or add the flag
///
/// A found entry is always marked modified, even when the flag already
/// has the requested modifier.
fn set_modifier(
    set: &mut PackageFileSet,
    package: &str,
    name: &str,
    modifier: Modifier,
) -> Result<()> {
    if let Some((id, index)) = effective_flag(set, package, name)? {
        if let Some(entry) = set.entry_mut(id) {
            entry.mark_modified();
            if let Some(flag) = entry.flag_mut(index) {
                flag.modifier = modifier;
            }
        }
        return Ok(());
    }

    // append to the most effective entry, or start a new one
    let id = match set.lookup(package)?.first() {
        Some(id) => *id,
        None => set.append(package)?,
    };
    if let Some(entry) = set.entry_mut(id) {
        entry.append(Flag {
            modifier,
            name: name.to_string(),
        });
    }
    Ok(())
}
