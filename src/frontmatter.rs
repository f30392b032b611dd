//! Leading `---` metadata block of a markdown document.

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, warn};

const DELIMITER: &str = "---";

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("document has no leading front matter block")]
    Missing,

    #[error("malformed front matter: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Parsed front matter. Only `title` is interpreted; the rest is kept as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub fields: Mapping,
}

impl FrontMatter {
    /// The `title` field, trimmed, when it is a non-empty string.
    pub fn title(&self) -> Option<&str> {
        match self.fields.get("title") {
            Some(Value::String(title)) => Some(title.trim()).filter(|t| !t.is_empty()),
            _ => None,
        }
    }
}

/// Returns the raw text between the delimiter lines.
///
/// The opening delimiter must be the very first line; both delimiter lines
/// may carry trailing whitespace.
pub fn split_front_matter(text: &str) -> Option<&str> {
    let (first, body_start) = next_line(text, 0)?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let mut pos = body_start;
    while pos < text.len() {
        let (line, next) = next_line(text, pos)?;
        if line.trim_end() == DELIMITER {
            let block = &text[body_start..pos];
            let block = block
                .strip_suffix('\n')
                .map_or(block, |b| b.strip_suffix('\r').unwrap_or(b));
            return Some(block);
        }
        pos = next;
    }
    None
}

/// Line starting at `start` (without its terminator) and the offset of the
/// next line.
fn next_line(text: &str, start: usize) -> Option<(&str, usize)> {
    let rest = text.get(start..)?;
    if rest.is_empty() {
        return None;
    }
    Some(match rest.find('\n') {
        Some(i) => (&rest[..i], start + i + 1),
        None => (rest, text.len()),
    })
}

pub fn parse_front_matter(text: &str) -> Result<FrontMatter, FrontMatterError> {
    let block = split_front_matter(text).ok_or(FrontMatterError::Missing)?;
    let fields = match serde_yaml::from_str::<Value>(block)? {
        Value::Mapping(fields) => fields,
        _ => Mapping::new(),
    };
    Ok(FrontMatter { fields })
}

/// Declared title of a document, if any.
///
/// Failures are logged, never returned: a missing block at debug level, a
/// malformed one as a warning.
pub fn extract_title(text: &str) -> Option<String> {
    match parse_front_matter(text) {
        Ok(front_matter) => front_matter.title().map(str::to_string),
        Err(e @ FrontMatterError::Missing) => {
            debug!("{e}");
            None
        }
        Err(e) => {
            warn!("{e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        let doc = "---\ntitle: \"Root Detection\"\nplatform: android\n---\n\n# Body\n";
        assert_eq!(extract_title(doc).as_deref(), Some("Root Detection"));
    }

    #[test]
    fn test_crlf_and_trailing_whitespace() {
        let doc = "---  \r\ntitle: Frida\r\n---\t\r\nbody";
        assert_eq!(extract_title(doc).as_deref(), Some("Frida"));
    }

    #[test]
    fn test_block_must_start_at_byte_zero() {
        assert!(extract_title("\n---\ntitle: X\n---\n").is_none());
        assert!(extract_title(" ---\ntitle: X\n---\n").is_none());
        assert!(matches!(
            parse_front_matter("# Heading\n"),
            Err(FrontMatterError::Missing)
        ));
    }

    #[test]
    fn test_unterminated_block() {
        assert!(matches!(
            parse_front_matter("---\ntitle: X\n"),
            Err(FrontMatterError::Missing)
        ));
    }

    #[test]
    fn test_closing_delimiter_is_a_whole_line() {
        assert!(matches!(
            parse_front_matter("---\ntitle: X\n---x\n"),
            Err(FrontMatterError::Missing)
        ));
        assert!(matches!(
            parse_front_matter("---\ntitle: X\n----\n"),
            Err(FrontMatterError::Missing)
        ));
    }

    #[test]
    fn test_malformed_yaml() {
        let doc = "---\ntitle: [unclosed\n---\n";
        assert!(matches!(parse_front_matter(doc), Err(FrontMatterError::Parse(_))));
        assert!(extract_title(doc).is_none());
    }

    #[test]
    fn test_missing_empty_or_non_string_title() {
        assert!(extract_title("---\nplatform: ios\n---\n").is_none());
        assert!(extract_title("---\ntitle: \"  \"\n---\n").is_none());
        assert!(extract_title("---\ntitle: [a, b]\n---\n").is_none());
        assert!(extract_title("---\n---\n").is_none());
    }

    #[test]
    fn test_split_front_matter() {
        assert_eq!(split_front_matter("---\na: 1\nb: 2\n---\nrest"), Some("a: 1\nb: 2"));
        assert_eq!(split_front_matter("---\n---\n"), Some(""));
    }
}
