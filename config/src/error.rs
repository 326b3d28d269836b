//! Error types for the declaration store and the directive engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Line is not a declaration; only used internally, such lines are kept verbatim
    #[error("Not a package entry")]
    InvalidEntry,

    #[error("{0} action requires an argument!")]
    MissingArgument(char),

    #[error("Ambiguous argument: {arg} (matches {})", .matches.join(", "))]
    AmbiguousArgument { arg: String, matches: Vec<String> },

    #[error("Global actions are not supported yet")]
    UnsupportedGlobalAction,

    #[error("{0} not found in package.* files")]
    NotFound(String),

    #[error("Unexpected namespace: {0}")]
    UnknownNamespace(String),

    #[error("Invalid atom: {0}")]
    InvalidAtom(String),

    #[error("ambiguous package name, matching: {}", .0.join(", "))]
    AmbiguousPackage(Vec<String>),

    #[error("unable to determine the category of {0} (mistyped name?)")]
    UnknownCategory(String),

    #[error("At argv[{index}]='{token}': {source}")]
    AtArgument {
        index: usize,
        token: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("Final file not found while migrating {0}")]
    MigrationTarget(PathBuf),

    #[error("IO error on {path}: {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Metadata error: {0}")]
    Metadata(String),
}

impl ConfigError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PathIo {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error with the position of the offending command-line token
    pub fn at_argument(self, index: usize, token: impl Into<String>) -> Self {
        Self::AtArgument {
            index,
            token: token.into(),
            source: Box::new(self),
        }
    }
}
