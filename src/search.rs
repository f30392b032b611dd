//! Browsable listing of the index, grouped by identifier type.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::index::{ReferenceEntry, ReferenceIndex};
use crate::taxonomy::{RefId, Taxonomy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListItem {
    /// Group heading, labelled with the type name.
    Separator { label: String },
    Entry {
        key: String,
        label: String,
        path: PathBuf,
    },
}

/// What a host does when an entry is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenRequest {
    pub path: PathBuf,
}

fn entry_item(entry: &ReferenceEntry, path: &Path) -> ListItem {
    ListItem::Entry {
        key: entry.key.clone(),
        label: format!("{} - {}", entry.key, entry.title),
        path: path.to_path_buf(),
    }
}

/// List the index for browsing.
///
/// Keys that do not classify, and entries with no known path, are left out.
/// With `kind`, a flat list of that type in numeric order. Without, every
/// type as its own group behind a separator, groups ordered by type name.
pub fn list(index: &ReferenceIndex, taxonomy: &Taxonomy, kind: Option<&str>) -> Vec<ListItem> {
    let mut groups: BTreeMap<String, Vec<(RefId, &ReferenceEntry, &Path)>> = BTreeMap::new();

    for entry in index.iter() {
        let Some(id) = taxonomy.classify(&entry.key) else {
            continue;
        };
        let Some(path) = entry.path.as_deref() else {
            continue;
        };
        if kind.is_some_and(|k| k != id.kind()) {
            continue;
        }
        groups.entry(id.kind().to_string()).or_default().push((id, entry, path));
    }

    let mut items = Vec::new();
    for (group, mut members) in groups {
        members.sort_by(|a, b| a.0.number.cmp(&b.0.number).then_with(|| a.0.cmp(&b.0)));
        if kind.is_none() {
            items.push(ListItem::Separator { label: group });
        }
        items.extend(members.into_iter().map(|(_, entry, path)| entry_item(entry, path)));
    }
    items
}

/// Keep entries whose label contains every whitespace-separated term of
/// `query`, case-insensitively. Separators whose group empties are dropped.
pub fn matches(items: &[ListItem], query: &str) -> Vec<ListItem> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return items.to_vec();
    }

    let mut out: Vec<ListItem> = Vec::new();
    let mut pending: Option<&ListItem> = None;

    for item in items {
        match item {
            ListItem::Separator { .. } => pending = Some(item),
            ListItem::Entry { label, .. } => {
                let label = label.to_lowercase();
                if terms.iter().all(|t| label.contains(t.as_str())) {
                    if let Some(separator) = pending.take() {
                        out.push(separator.clone());
                    }
                    out.push(item.clone());
                }
            }
        }
    }
    out
}

/// Map a picked item to an open request. Separators open nothing.
pub fn resolve(item: &ListItem) -> Option<OpenRequest> {
    match item {
        ListItem::Entry { path, .. } => Some(OpenRequest { path: path.clone() }),
        ListItem::Separator { .. } => None,
    }
}
