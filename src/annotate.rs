//! Inline title annotations and sigil-triggered completion.

use std::ffi::OsStr;
use std::path::Path;

use serde::Serialize;

use crate::index::ReferenceIndex;
use crate::taxonomy::Taxonomy;

pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Kind of document an editor reports. Only markdown is annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Markdown,
    Other,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some("md" | "markdown") => DocumentKind::Markdown,
            _ => DocumentKind::Other,
        }
    }

    /// From an editor language identifier such as `markdown`.
    pub fn from_language_id(id: &str) -> Self {
        if id.eq_ignore_ascii_case("markdown") {
            DocumentKind::Markdown
        } else {
            DocumentKind::Other
        }
    }
}

/// One mention of an identifier, with the text to show next to it.
///
/// `start..end` is a byte range into the annotated text covering only the
/// identifier; a preceding sigil is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSpan {
    pub start: usize,
    pub end: usize,
    pub key: String,
    pub display_text: String,
    pub resolved: bool,
}

impl AnnotationSpan {
    /// Text rendered after the mention, e.g. ` [Frida]`.
    pub fn label(&self) -> String {
        format!(" [{}]", self.display_text)
    }
}

/// Find every mention in `text` and resolve it against `index`.
///
/// Mentions missing from the index are still reported, with `placeholder` as
/// their display text.
pub fn annotate(
    text: &str,
    kind: DocumentKind,
    index: &ReferenceIndex,
    taxonomy: &Taxonomy,
    placeholder: &str,
) -> Vec<AnnotationSpan> {
    if kind != DocumentKind::Markdown {
        return Vec::new();
    }

    taxonomy
        .mention_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.name("id"))
        .map(|id| {
            let key = id.as_str();
            let (display_text, resolved) = match index.title(key) {
                Some(title) => (title.to_string(), true),
                None => (placeholder.to_string(), false),
            };
            AnnotationSpan {
                start: id.start(),
                end: id.end(),
                key: key.to_string(),
                display_text,
                resolved,
            }
        })
        .collect()
}

/// Zero-based line and UTF-16 column of a byte offset, the position model
/// editors use. Offsets past the end clamp to the end of the text.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let col = before[line_start..].encode_utf16().count();
    (line, col)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    /// `KEY - title`, shown in the completion list.
    pub label: String,
    /// Only the key is inserted.
    pub insert_text: String,
}

/// Completion candidates for the text on the cursor's line before the cursor.
///
/// Returns `None` unless that text ends with the sigil.
pub fn complete(
    line_prefix: &str,
    index: &ReferenceIndex,
    sigil: char,
) -> Option<Vec<CompletionItem>> {
    if !line_prefix.ends_with(sigil) {
        return None;
    }
    Some(
        index
            .iter()
            .map(|entry| {
                let title = if entry.title.is_empty() {
                    UNKNOWN_TITLE
                } else {
                    entry.title.as_str()
                };
                CompletionItem {
                    label: format!("{} - {}", entry.key, title),
                    insert_text: entry.key.clone(),
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UNRESOLVED_PLACEHOLDER;
    use crate::index::ReferenceEntry;
    use crate::taxonomy::Family;

    fn taxonomy() -> Taxonomy {
        let families = vec![Family::new("X", &["TECH", "TOOL"]), Family::new("Y", &[])];
        Taxonomy::new(families, '@').unwrap()
    }

    fn index(entries: &[(&str, &str)]) -> ReferenceIndex {
        let mut index = ReferenceIndex::new();
        for (key, title) in entries {
            index.insert(ReferenceEntry {
                key: key.to_string(),
                title: title.to_string(),
                path: None,
            });
        }
        index
    }

    fn run(text: &str, index: &ReferenceIndex) -> Vec<AnnotationSpan> {
        annotate(text, DocumentKind::Markdown, index, &taxonomy(), UNRESOLVED_PLACEHOLDER)
    }

    #[test]
    fn test_resolved_mention_excludes_sigil() {
        let text = "See @X-TECH-0001 for details";
        let spans = run(text, &index(&[("X-TECH-0001", "Foo")]));
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].start..spans[0].end], "X-TECH-0001");
        assert_eq!(spans[0].display_text, "Foo");
        assert!(spans[0].resolved);
        assert_eq!(spans[0].label(), " [Foo]");
    }

    #[test]
    fn test_unresolved_mention_uses_placeholder() {
        let spans = run("See @X-TECH-0001 for details", &ReferenceIndex::new());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].display_text, UNRESOLVED_PLACEHOLDER);
        assert!(!spans[0].resolved);
    }

    #[test]
    fn test_bare_and_multiple_mentions() {
        let text = "X-TOOL-0002 and @Y-0001, then X-TECH-0003.";
        let spans = run(text, &index(&[("Y-0001", "Weakness")]));
        let keys: Vec<_> = spans.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["X-TOOL-0002", "Y-0001", "X-TECH-0003"]);
        assert_eq!(spans[1].display_text, "Weakness");
        for span in &spans {
            assert_eq!(&text[span.start..span.end], span.key);
        }
    }

    #[test]
    fn test_ignores_near_misses() {
        let spans = run("X-TECH-001 X-FOO-0001 X-TECH-00012 Z-0001", &ReferenceIndex::new());
        assert!(spans.is_empty());
    }

    #[test]
    fn test_other_documents_are_untouched() {
        let spans = annotate(
            "@X-TECH-0001",
            DocumentKind::Other,
            &ReferenceIndex::new(),
            &taxonomy(),
            UNRESOLVED_PLACEHOLDER,
        );
        assert!(spans.is_empty());
    }

    #[test]
    fn test_document_kind() {
        assert_eq!(DocumentKind::from_path(Path::new("a/X-TECH-0001.md")), DocumentKind::Markdown);
        assert_eq!(DocumentKind::from_path(Path::new("notes.markdown")), DocumentKind::Markdown);
        assert_eq!(DocumentKind::from_path(Path::new("main.rs")), DocumentKind::Other);
        assert_eq!(DocumentKind::from_language_id("Markdown"), DocumentKind::Markdown);
        assert_eq!(DocumentKind::from_language_id("plaintext"), DocumentKind::Other);
    }

    #[test]
    fn test_line_col() {
        let text = "first\nsé @X-TECH-0001";
        let spans = run(text, &ReferenceIndex::new());
        assert_eq!(line_col(text, spans[0].start), (1, 4));
        assert_eq!(line_col(text, 0), (0, 0));
        assert_eq!(line_col(text, 999), (1, 15));
    }

    #[test]
    fn test_complete_after_sigil_only() {
        let index = index(&[("X-TOOL-0002", "Bar"), ("X-TECH-0001", "")]);
        assert!(complete("text ", &index, '@').is_none());

        let items = complete("see @", &index, '@').unwrap();
        assert_eq!(
            items,
            vec![
                CompletionItem {
                    label: "X-TECH-0001 - Unknown Title".into(),
                    insert_text: "X-TECH-0001".into(),
                },
                CompletionItem {
                    label: "X-TOOL-0002 - Bar".into(),
                    insert_text: "X-TOOL-0002".into(),
                },
            ]
        );
    }
}
