//! The reference index, its JSON snapshot, and the store that owns the live
//! copy.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frontmatter::extract_title;
use crate::scanner::Scanner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub key: String,
    pub title: String,
    /// Absent for entries loaded from a title-only snapshot.
    pub path: Option<PathBuf>,
}

/// Identifier → entry, kept in key order so serialization is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    entries: BTreeMap<String, ReferenceEntry>,
}

/// On-disk entry. Older snapshots store only the title.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum SnapshotEntry {
    Title(String),
    Full {
        title: String,
        #[serde(rename = "filePath", default, skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
    },
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ReferenceEntry> {
        self.entries.get(key)
    }

    pub fn title(&self, key: &str) -> Option<&str> {
        self.get(key).map(|entry| entry.title.as_str())
    }

    /// Insert an entry unless its key is already present. Returns whether it
    /// was inserted.
    pub fn insert(&mut self, entry: ReferenceEntry) -> bool {
        if self.entries.contains_key(&entry.key) {
            return false;
        }
        self.entries.insert(entry.key.clone(), entry);
        true
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.values()
    }

    /// Pretty JSON with four-space indentation and a trailing newline.
    pub fn to_json(&self) -> String {
        let snapshot: BTreeMap<&str, SnapshotEntry> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                (
                    key.as_str(),
                    SnapshotEntry::Full {
                        title: entry.title.clone(),
                        file_path: entry.path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                    },
                )
            })
            .collect();

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        // Serializing string maps into a Vec cannot fail.
        if snapshot.serialize(&mut ser).is_err() {
            return String::from("{}\n");
        }
        buf.push(b'\n');
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Parse a snapshot, accepting both the title-only and the structured
    /// entry shape.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let snapshot: BTreeMap<String, SnapshotEntry> = serde_json::from_str(content)?;
        let entries = snapshot
            .into_iter()
            .map(|(key, entry)| {
                let (title, path) = match entry {
                    SnapshotEntry::Title(title) => (title, None),
                    SnapshotEntry::Full { title, file_path } => {
                        (title, file_path.filter(|p| !p.is_empty()).map(PathBuf::from))
                    }
                };
                (key.clone(), ReferenceEntry { key, title, path })
            })
            .collect();
        Ok(Self { entries })
    }
}

/// Read a snapshot from disk. A missing file is an empty index.
pub fn load(path: &Path) -> Result<ReferenceIndex> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no reference snapshot");
            return Ok(ReferenceIndex::new());
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    ReferenceIndex::from_json(&content).map_err(|source| Error::IndexParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a snapshot via a temporary sibling and a rename.
pub fn save(index: &ReferenceIndex, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, index.to_json()).map_err(|e| Error::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Scan `root` and index every document that declares a title.
///
/// The key is the file stem. Documents without a title are skipped. When two
/// documents share a stem, the first in scan order wins.
pub fn build_index(scanner: &Scanner, root: &Path) -> ReferenceIndex {
    let mut index = ReferenceIndex::new();

    for path in scanner.scan(root) {
        let Some(key) = path.file_stem().and_then(OsStr::to_str).map(str::to_string) else {
            continue;
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("{}", Error::io(&path, e));
                continue;
            }
        };
        let Some(title) = extract_title(&content) else {
            debug!(path = %path.display(), "no title, skipped");
            continue;
        };
        let entry = ReferenceEntry {
            key: key.clone(),
            title,
            path: Some(path.clone()),
        };
        if !index.insert(entry) {
            warn!(key = %key, path = %path.display(), "duplicate identifier ignored");
        }
    }

    index
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// The index was replaced and the snapshot written.
    Updated { entries: usize, snapshot: PathBuf },
    /// No document yielded a title. Nothing was replaced.
    Empty,
}

/// Owner of the live index.
///
/// Readers take an `Arc` to the current index and keep it for as long as
/// they need; a rebuild swaps in a new one in a single store.
#[derive(Debug)]
pub struct IndexStore {
    current: ArcSwap<ReferenceIndex>,
    snapshot_path: PathBuf,
}

impl IndexStore {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            current: ArcSwap::from_pointee(ReferenceIndex::new()),
            snapshot_path: snapshot_path.into(),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn current(&self) -> Arc<ReferenceIndex> {
        self.current.load_full()
    }

    pub fn replace(&self, index: ReferenceIndex) {
        self.current.store(Arc::new(index));
    }

    /// Load the snapshot into the store. On a corrupt snapshot the store is
    /// emptied and the error returned.
    pub fn load(&self) -> Result<usize> {
        match load(&self.snapshot_path) {
            Ok(index) => {
                let count = index.len();
                self.replace(index);
                info!(entries = count, path = %self.snapshot_path.display(), "loaded references");
                Ok(count)
            }
            Err(e) => {
                self.replace(ReferenceIndex::new());
                Err(e)
            }
        }
    }

    /// Rebuild from `root`, persist, then swap.
    ///
    /// An empty result leaves both the snapshot and the live index alone.
    pub fn rebuild(&self, scanner: &Scanner, root: &Path) -> Result<RebuildOutcome> {
        let start = Instant::now();
        let index = build_index(scanner, root);

        if index.is_empty() {
            warn!(root = %root.display(), "no document declared a title");
            return Ok(RebuildOutcome::Empty);
        }

        save(&index, &self.snapshot_path)?;
        let entries = index.len();
        self.replace(index);
        info!(entries, elapsed = ?start.elapsed(), "references rebuilt");

        Ok(RebuildOutcome::Updated {
            entries,
            snapshot: self.snapshot_path.clone(),
        })
    }
}
