use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the index lifecycle and configuration loading.
///
/// Per-document and per-directory problems (unreadable subtrees, missing or
/// malformed front matter) are logged where they happen and never reach the
/// caller as an `Error`; they only shrink the resulting index.
#[derive(Debug, Error)]
pub enum Error {
    /// A directory could not be listed while scanning.
    #[error("cannot read directory: {0}")]
    ScanDirectory(#[from] ignore::Error),

    /// The persisted snapshot exists but is not a valid reference map.
    #[error("reference snapshot {path} is corrupt: {source}")]
    IndexParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::Config`].
    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An exclusion glob failed to compile.
    #[error("invalid exclude pattern: {0}")]
    Glob(#[from] globset::Error),

    /// The configured identifier families cannot form a grammar.
    #[error("invalid taxonomy: {0}")]
    InvalidTaxonomy(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
