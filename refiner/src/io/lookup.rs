//! Lookup collaborators used by the full classifier.
//!
//! All three are optional. Failures are reported as `Err` and the classifier
//! degrades to an empty result for that stage.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A definition found for a term in an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionCandidate {
    pub text: String,
    pub source: String,
    /// Reliability of the source in `[0, 1]`.
    pub reliability_score: f64,
}

/// A legal or domain reference found in a text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// A recognized citation, as a byte range into the searched text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub trait DefinitionLookup {
    fn search(&self, term: &str, domain_hint: Option<&str>) -> Result<Vec<DefinitionCandidate>>;
}

pub trait ReferenceLookup {
    fn search_references(&self, text: &str) -> Result<Vec<ReferenceDescriptor>>;
}

pub trait SourceRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<CitationSpan>>;
}

/// Collaborator that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl DefinitionLookup for NoLookup {
    fn search(&self, _term: &str, _domain_hint: Option<&str>) -> Result<Vec<DefinitionCandidate>> {
        Ok(Vec::new())
    }
}

impl ReferenceLookup for NoLookup {
    fn search_references(&self, _text: &str) -> Result<Vec<ReferenceDescriptor>> {
        Ok(Vec::new())
    }
}

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\b(article|art\.|section|sec\.)|§)\s*\d+[a-z]?(:\d+)?")
        .expect("citation regex")
});

/// Recognizes article and section citations such as `art. 5:2` or `§ 12a`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternSourceRecognizer;

impl SourceRecognizer for PatternSourceRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<CitationSpan>> {
        Ok(CITATION_RE
            .find_iter(text)
            .map(|found| CitationSpan {
                text: found.as_str().to_string(),
                start: found.start(),
                end: found.end(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_article_and_section_citations() {
        let text = "Permit under Article 2.1 of the act, see also art. 5:2 and § 12a.";
        let spans = PatternSourceRecognizer.recognize(text).expect("recognize");
        let found: Vec<&str> = spans.iter().map(|span| span.text.as_str()).collect();
        assert_eq!(found, vec!["Article 2", "art. 5:2", "§ 12a"]);
        assert_eq!(&text[spans[0].start..spans[0].end], "Article 2");
    }

    #[test]
    fn no_lookup_is_empty() {
        assert!(NoLookup.search("permit", None).expect("search").is_empty());
        assert!(NoLookup.search_references("text").expect("refs").is_empty());
    }
}
