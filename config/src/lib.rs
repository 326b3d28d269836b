//! Package flag configuration
//!
//! This crate edits the per-package declaration files of a Gentoo-style
//! configuration root (package.use, package.accept_keywords,
//! package.license, package.env) without disturbing anything it does not
//! need to change: comments, blank lines and untouched entries are written
//! back byte for byte.
//!
//! # Overview
//!
//! - [`entry`]: one line of a package.* file
//! - [`file`]: one package.* file and its atomic write
//! - [`file_set`]: all files of one domain, in effectiveness order
//! - [`files`]: the domains of a configuration root
//! - [`oracle`]: which domain a flag belongs to
//! - [`action`]: parsing and resolving `+flag`, `-flag`, `%flag`, `?flag`
//! - [`action_set`]: batches of directives and command-line parsing
//! - [`settings`]: tool settings (TOML)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pkgflags_config::{parse_actions, FlagCache, PackageFiles, StaticMetadata, Verbatim};
//!
//! let args: Vec<String> = vec!["dev-libs/foo".into(), "+ssl".into()];
//! let mut cache = FlagCache::new(StaticMetadata::new());
//! let mut files = PackageFiles::new("/etc/portage", &["amd64"]);
//!
//! for set in parse_actions(&args, &mut cache, &Verbatim).unwrap() {
//!     set.apply(&mut files, &mut std::io::stdout()).unwrap();
//! }
//! files.write().unwrap();
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! /etc/portage/
//! ├── make.conf                   # ACCEPT_KEYWORDS
//! ├── package.use                 # file or directory
//! ├── package.keywords            # legacy, migrated on request
//! ├── package.accept_keywords
//! ├── package.license
//! └── package.env
//! ```

// Core modules
pub mod atom;
pub mod error;
pub mod flag;
pub mod namespace;

// Declaration store
pub mod entry;
pub mod file;
pub mod file_set;
pub mod files;

// Directive engine
pub mod action;
pub mod action_set;
pub mod oracle;

pub mod settings;

// Re-exports for convenience
pub use action::{Action, ActionKind, RawAction};
pub use action_set::{parse_actions, ActionSet, PackageExpander, Verbatim};
pub use atom::{PackageAtom, VersionOp};
pub use entry::{Line, PackageEntry};
pub use error::{ConfigError, Result};
pub use file::{backup_path, PackageFile};
pub use file_set::{EntryId, FileSetKind, PackageFileSet, DEFAULT_FILE_NAME};
pub use files::{default_keywords, PackageFiles};
pub use flag::{Flag, Modifier};
pub use namespace::Namespace;
pub use oracle::{FlagCache, MetadataProvider, StaticMetadata};
pub use settings::{detect_arch, env_vars, paths, Settings};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        parse_actions, Action, ActionKind, ActionSet, ConfigError, FlagCache, MetadataProvider,
        Namespace, PackageExpander, PackageFiles, Result, Settings,
    };
}
