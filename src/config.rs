//! `.refmark.toml` configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::taxonomy::{default_families, Family, Taxonomy};

pub const DEFAULT_CONFIG_FILE: &str = ".refmark.toml";
pub const DEFAULT_SNAPSHOT_FILE: &str = "references.json";
pub const UNRESOLVED_PLACEHOLDER: &str = "Unknown Reference";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the document tree. Relative paths resolve against the
    /// directory the tool runs in.
    pub root: PathBuf,
    /// Snapshot location, relative to `root` unless absolute.
    pub snapshot: PathBuf,
    /// Character that introduces a mention and triggers completion.
    pub sigil: char,
    /// Directory names that are never descended into.
    pub exclude_dirs: Vec<String>,
    /// Extra glob patterns (matched against paths relative to `root`). A
    /// directory is pruned when a pattern matches it or its contents.
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
    pub follow_links: bool,
    /// Display text for mentions that are not in the index.
    pub placeholder: String,
    pub taxonomy: TaxonomyConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    pub families: Vec<Family>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            families: default_families(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            sigil: '@',
            exclude_dirs: vec!["docs".to_string()],
            exclude: Vec::new(),
            respect_gitignore: false,
            follow_links: false,
            placeholder: UNRESOLVED_PLACEHOLDER.to_string(),
            taxonomy: TaxonomyConfig::default(),
        }
    }
}

impl Config {
    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        Self::parse(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(&self.snapshot)
    }

    pub fn taxonomy(&self) -> Result<Taxonomy> {
        Taxonomy::new(self.taxonomy.families.clone(), self.sigil)
    }
}
