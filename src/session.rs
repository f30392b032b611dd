//! Event interface for an editor host.
//!
//! A host wires its own events (activation, document edits, commands) to the
//! methods here and renders what they return. Nothing in this module knows
//! about any particular editor.

use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tracing::debug;

use crate::annotate::{self, AnnotationSpan, CompletionItem, DocumentKind};
use crate::config::Config;
use crate::error::Result;
use crate::index::{IndexStore, RebuildOutcome, ReferenceIndex};
use crate::scanner::Scanner;
use crate::search::{self, ListItem, OpenRequest};
use crate::taxonomy::Taxonomy;

/// An open document as the host identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub kind: DocumentKind,
}

impl DocumentRef {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = DocumentKind::from_path(&path);
        Self { path, kind }
    }
}

pub struct Session {
    config: Config,
    taxonomy: Taxonomy,
    scanner: Scanner,
    store: IndexStore,
    /// Current spans per open document, plus the text they were computed
    /// from so a rebuild can refresh them.
    documents: AHashMap<DocumentRef, (String, Vec<AnnotationSpan>)>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let taxonomy = config.taxonomy()?;
        let scanner = Scanner::new(&config, taxonomy.clone())?;
        let store = IndexStore::new(config.snapshot_path());
        Ok(Self {
            config,
            taxonomy,
            scanner,
            store,
            documents: AHashMap::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn index(&self) -> std::sync::Arc<ReferenceIndex> {
        self.store.current()
    }

    /// Load the persisted snapshot. A corrupt snapshot leaves an empty index
    /// and is returned as an error for the host to report.
    pub fn on_activate(&mut self) -> Result<usize> {
        let loaded = self.store.load();
        self.refresh_all();
        loaded
    }

    /// Recompute the spans of `doc` from scratch, replacing any previous set.
    pub fn on_document_changed(&mut self, doc: &DocumentRef, text: &str) -> &[AnnotationSpan] {
        let spans = self.annotate(doc.kind, text);
        let slot = self.documents.entry(doc.clone()).or_default();
        *slot = (text.to_string(), spans);
        &slot.1
    }

    pub fn on_document_closed(&mut self, doc: &DocumentRef) {
        self.documents.remove(doc);
    }

    /// Spans last computed for `doc`.
    pub fn annotations(&self, doc: &DocumentRef) -> &[AnnotationSpan] {
        self.documents
            .get(doc)
            .map(|(_, spans)| spans.as_slice())
            .unwrap_or(&[])
    }

    /// Rebuild the index from the configured root and refresh every open
    /// document against the result.
    pub fn on_rebuild_requested(&mut self) -> Result<RebuildOutcome> {
        let root = self.config.root.clone();
        self.rebuild(&root)
    }

    pub fn rebuild(&mut self, root: &Path) -> Result<RebuildOutcome> {
        let outcome = self.store.rebuild(&self.scanner, root)?;
        if let RebuildOutcome::Updated { .. } = outcome {
            self.refresh_all();
        }
        Ok(outcome)
    }

    pub fn complete(&self, line_prefix: &str) -> Option<Vec<CompletionItem>> {
        annotate::complete(line_prefix, &self.store.current(), self.taxonomy.sigil())
    }

    pub fn search(&self, kind: Option<&str>) -> Vec<ListItem> {
        search::list(&self.store.current(), &self.taxonomy, kind)
    }

    /// Open request for `key`, if it is browsable.
    pub fn resolve(&self, key: &str) -> Option<OpenRequest> {
        self.search(None).iter().find_map(|item| match item {
            ListItem::Entry { key: k, .. } if k == key => search::resolve(item),
            _ => None,
        })
    }

    fn annotate(&self, kind: DocumentKind, text: &str) -> Vec<AnnotationSpan> {
        annotate::annotate(
            text,
            kind,
            &self.store.current(),
            &self.taxonomy,
            &self.config.placeholder,
        )
    }

    fn refresh_all(&mut self) {
        let index = self.store.current();
        for (doc, (text, spans)) in self.documents.iter_mut() {
            *spans = annotate::annotate(
                text,
                doc.kind,
                &index,
                &self.taxonomy,
                &self.config.placeholder,
            );
        }
        debug!(documents = self.documents.len(), "annotations refreshed");
    }
}
