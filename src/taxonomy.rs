//! Identifier grammar for reference documents.
//!
//! An identifier is `PREFIX-SUBTYPE-NNNN` for families that carry subtypes
//! (`MASTG-TECH-0012`) and `PREFIX-NNNN` for families that don't
//! (`MASWE-0005`). The number is always four ASCII digits.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One identifier family: a domain prefix and its closed set of subtypes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub prefix: String,
    #[serde(default)]
    pub subtypes: Vec<String>,
}

impl Family {
    pub fn new(prefix: &str, subtypes: &[&str]) -> Self {
        Self {
            prefix: prefix.to_string(),
            subtypes: subtypes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn default_families() -> Vec<Family> {
    vec![
        Family::new("MASTG", &["TECH", "TOOL", "TEST", "DEMO", "BEST"]),
        Family::new("MASWE", &[]),
    ]
}

/// A classified identifier.
///
/// Field order matters: the derived `Ord` sorts by domain, then subtype, then
/// numeric id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId {
    pub domain: String,
    pub subtype: Option<String>,
    pub number: u16,
}

impl RefId {
    /// The effective type used for grouping: the subtype when the family has
    /// one, the domain otherwise.
    pub fn kind(&self) -> &str {
        self.subtype.as_deref().unwrap_or(&self.domain)
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtype {
            Some(subtype) => write!(f, "{}-{}-{:04}", self.domain, subtype, self.number),
            None => write!(f, "{}-{:04}", self.domain, self.number),
        }
    }
}

/// Compiled identifier grammar for a closed set of families.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    families: Vec<Family>,
    exact: Regex,
    mention: Regex,
    sigil: char,
}

impl Taxonomy {
    pub fn new(families: Vec<Family>, sigil: char) -> Result<Self> {
        if families.is_empty() {
            return Err(Error::InvalidTaxonomy("no identifier families configured".into()));
        }
        for family in &families {
            check_name(&family.prefix)?;
            for subtype in &family.subtypes {
                check_name(subtype)?;
            }
        }

        let body = grammar_body(&families);
        let exact = Regex::new(&format!("^(?:{body})$"))
            .map_err(|e| Error::InvalidTaxonomy(e.to_string()))?;
        let sigil_pat = regex::escape(&sigil.to_string());
        let mention = Regex::new(&format!(r"(?P<sigil>{sigil_pat})?\b(?P<id>{body})\b"))
            .map_err(|e| Error::InvalidTaxonomy(e.to_string()))?;

        Ok(Self {
            families,
            exact,
            mention,
            sigil,
        })
    }

    /// The built-in MASTG/MASWE families with the `@` sigil.
    pub fn mastg() -> Result<Self> {
        Taxonomy::new(default_families(), '@')
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn sigil(&self) -> char {
        self.sigil
    }

    /// Pattern for in-text mentions: an optional sigil followed by an id.
    /// Capture `id` excludes the sigil.
    pub fn mention_pattern(&self) -> &Regex {
        &self.mention
    }

    /// True if `key` matches the grammar of one of the configured families.
    pub fn validate(&self, key: &str) -> bool {
        self.exact.is_match(key)
    }

    /// Validate and split `key` into its parts.
    pub fn classify(&self, key: &str) -> Option<RefId> {
        if !self.validate(key) {
            return None;
        }
        decompose(key)
    }

    /// Every effective type this taxonomy can produce, in declaration order.
    pub fn kinds(&self) -> Vec<&str> {
        self.families
            .iter()
            .flat_map(|family| {
                if family.subtypes.is_empty() {
                    vec![family.prefix.as_str()]
                } else {
                    family.subtypes.iter().map(String::as_str).collect()
                }
            })
            .collect()
    }
}

/// Split an identifier into domain, subtype and number by its dashes.
///
/// Purely structural: membership of the prefix and subtype in a family is
/// not checked, that is [`Taxonomy::validate`]'s job.
pub fn decompose(key: &str) -> Option<RefId> {
    let parts: Vec<&str> = key.split('-').collect();
    let (domain, subtype, digits) = match parts.as_slice() {
        [domain, digits] => (*domain, None, *digits),
        [domain, subtype, digits] => (*domain, Some(*subtype), *digits),
        _ => return None,
    };
    if domain.is_empty() || subtype.is_some_and(str::is_empty) {
        return None;
    }
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(RefId {
        domain: domain.to_string(),
        subtype: subtype.map(str::to_string),
        number: digits.parse().ok()?,
    })
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Error::InvalidTaxonomy(format!(
            "'{name}' is not an alphanumeric identifier segment"
        )));
    }
    Ok(())
}

fn grammar_body(families: &[Family]) -> String {
    let alternatives: Vec<String> = families
        .iter()
        .map(|family| {
            let prefix = regex::escape(&family.prefix);
            if family.subtypes.is_empty() {
                prefix
            } else {
                let subtypes: Vec<String> =
                    family.subtypes.iter().map(|s| regex::escape(s)).collect();
                format!("{prefix}-(?:{})", subtypes.join("|"))
            }
        })
        .collect();
    format!("(?:{})-[0-9]{{4}}", alternatives.join("|"))
}
