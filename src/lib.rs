//! refmark - reference index and inline title annotation for ID-named
//! markdown documents.
//!
//! Documents named after an identifier (`MASTG-TECH-0012.md`, `MASWE-0005.md`)
//! declare a `title` in their front matter. [`index::build_index`] collects
//! those titles into a [`ReferenceIndex`], [`annotate::annotate`] attaches
//! them to mentions such as `@MASTG-TECH-0012` in any markdown text, and
//! [`search::list`] turns the index into a grouped listing for navigation.
//! [`Session`] ties these together behind an editor-agnostic event interface.

pub mod annotate;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod index;
pub mod scanner;
pub mod search;
pub mod session;
pub mod taxonomy;

pub use annotate::{AnnotationSpan, CompletionItem, DocumentKind};
pub use config::Config;
pub use error::{Error, Result};
pub use index::{IndexStore, RebuildOutcome, ReferenceEntry, ReferenceIndex};
pub use scanner::Scanner;
pub use search::{ListItem, OpenRequest};
pub use session::{DocumentRef, Session};
pub use taxonomy::{Family, RefId, Taxonomy};
