//! Directory walk that finds reference documents.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashSet;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::taxonomy::{decompose, Taxonomy};

/// Extension every reference document carries.
pub const DOCUMENT_EXTENSION: &str = "md";

/// Directory pruning rules, shared with the walker's entry filter.
#[derive(Debug)]
struct Exclusions {
    names: Vec<String>,
    globs: GlobSet,
}

impl Exclusions {
    fn prunes(&self, root: &Path, dir: &Path) -> bool {
        let Some(name) = dir.file_name().and_then(OsStr::to_str) else {
            return false;
        };
        if name.starts_with('.') || self.names.iter().any(|n| n == name) {
            return true;
        }
        // A directory is also pruned when a pattern matches what it contains,
        // so `archive/**` stops the walk at `archive` itself.
        let rel = dir.strip_prefix(root).unwrap_or(dir);
        self.globs.is_match(rel) || self.globs.is_match(rel.join("_"))
    }
}

#[derive(Debug, Clone)]
pub struct Scanner {
    taxonomy: Taxonomy,
    exclusions: Arc<Exclusions>,
    respect_gitignore: bool,
    follow_links: bool,
}

impl Scanner {
    pub fn new(config: &Config, taxonomy: Taxonomy) -> Result<Self> {
        let mut globs = GlobSetBuilder::new();
        for pattern in &config.exclude {
            globs.add(Glob::new(pattern)?);
        }
        Ok(Self {
            taxonomy,
            exclusions: Arc::new(Exclusions {
                names: config.exclude_dirs.clone(),
                globs: globs.build()?,
            }),
            respect_gitignore: config.respect_gitignore,
            follow_links: config.follow_links,
        })
    }

    /// True if `path` names a reference document: `<identifier>.md`.
    pub fn is_candidate(&self, path: &Path) -> bool {
        if path.extension() != Some(OsStr::new(DOCUMENT_EXTENSION)) {
            return false;
        }
        path.file_stem()
            .and_then(OsStr::to_str)
            .is_some_and(|stem| self.taxonomy.validate(stem))
    }

    /// Walk `root` and return every candidate document, deduplicated and
    /// sorted by numeric id, then by path.
    ///
    /// Excluded directories are pruned before descent. Unreadable
    /// directories are logged and contribute nothing.
    pub fn scan(&self, root: &Path) -> Vec<PathBuf> {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

        let mut builder = WalkBuilder::new(&root);
        builder
            .hidden(false)
            .ignore(self.respect_gitignore)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .require_git(false)
            .follow_links(self.follow_links);

        let exclusions = Arc::clone(&self.exclusions);
        let filter_root = root.clone();
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let prune =
                entry.depth() > 0 && is_dir && exclusions.prunes(&filter_root, entry.path());
            if prune {
                debug!(dir = %entry.path().display(), "pruned");
            }
            !prune
        });

        let mut seen: AHashSet<PathBuf> = AHashSet::new();
        let mut results = Vec::new();

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("{}", Error::ScanDirectory(e));
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.into_path();
            if self.is_candidate(&path) && seen.insert(path.clone()) {
                results.push(path);
            }
        }

        results.sort_by_cached_key(|path| {
            (numeric_key(path), path.to_string_lossy().into_owned())
        });
        debug!(root = %root.display(), count = results.len(), "scan complete");
        results
    }
}

fn numeric_key(path: &Path) -> u16 {
    path.file_stem()
        .and_then(OsStr::to_str)
        .and_then(decompose)
        .map_or(u16::MAX, |id| id.number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scanner() -> Scanner {
        Scanner::new(&Config::default(), Taxonomy::mastg().unwrap()).unwrap()
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "---\ntitle: x\n---\n").unwrap();
    }

    #[test]
    fn test_is_candidate() {
        let s = scanner();
        assert!(s.is_candidate(Path::new("/t/MASTG-TECH-0001.md")));
        assert!(s.is_candidate(Path::new("MASWE-0001.md")));
        assert!(!s.is_candidate(Path::new("MASTG-TECH-0001.MD")));
        assert!(!s.is_candidate(Path::new("MASTG-TECH-0001.txt")));
        assert!(!s.is_candidate(Path::new("MASTG-TECH-0001")));
        assert!(!s.is_candidate(Path::new("README.md")));
        assert!(!s.is_candidate(Path::new("MASTG-TECH-0001-draft.md")));
    }

    #[test]
    fn test_scan_prunes_excluded_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "techniques/MASTG-TECH-0002.md");
        touch(root, "MASTG-TECH-0001.md");
        touch(root, "docs/MASTG-TECH-0003.md");
        touch(root, ".cache/MASTG-TECH-0004.md");
        touch(root, "techniques/notes.md");

        let found = scanner().scan(root);
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["MASTG-TECH-0001.md", "MASTG-TECH-0002.md"]);
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_scan_orders_numerically_across_types() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "a/MASTG-TOOL-0010.md");
        touch(root, "b/MASTG-TECH-0002.md");
        touch(root, "c/MASWE-0001.md");

        let names: Vec<_> = scanner()
            .scan(root)
            .iter()
            .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["MASWE-0001", "MASTG-TECH-0002", "MASTG-TOOL-0010"]);
    }

    #[test]
    fn test_scan_exclude_globs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "archive/old/MASTG-TECH-0001.md");
        touch(root, "live/MASTG-TECH-0002.md");

        let config = Config {
            exclude: vec!["archive".to_string()],
            ..Config::default()
        };
        let found = Scanner::new(&config, Taxonomy::mastg().unwrap()).unwrap().scan(root);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("live/MASTG-TECH-0002.md"));
    }

    #[test]
    fn test_scan_exclude_recursive_glob_prunes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "archive/MASTG-TECH-0005.md");
        touch(root, "archive/old/MASTG-TECH-0006.md");
        touch(root, "live/MASTG-TECH-0002.md");
        touch(root, "MASWE-0001.md");

        let config = Config {
            exclude: vec!["archive/**".to_string()],
            ..Config::default()
        };
        let found = Scanner::new(&config, Taxonomy::mastg().unwrap()).unwrap().scan(root);
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["MASWE-0001", "MASTG-TECH-0002"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "tools/MASTG-TOOL-0001.md");
        std::os::unix::fs::symlink(root.join("missing"), root.join("tools/broken")).unwrap();
        std::os::unix::fs::symlink(
            root.join("gone/MASTG-TOOL-0002.md"),
            root.join("tools/MASTG-TOOL-0002.md"),
        )
        .unwrap();

        let config = Config {
            follow_links: true,
            ..Config::default()
        };
        let found = Scanner::new(&config, Taxonomy::mastg().unwrap()).unwrap().scan(root);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("tools/MASTG-TOOL-0001.md"));
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scanner().scan(&dir.path().join("missing")).is_empty());
    }
}
