//! Quick ontological classification of a term.
//!
//! A fixed-precedence decision tree over lexical cues:
//! process > type > result > instance > default (type).
//! Runs in O(term length) and never fails.

use crate::core::types::Category;

/// Suffixes of the last word that mark an activity. Longest first.
pub(crate) const PROCESS_SUFFIXES: &[&str] = &["ization", "isation", "tion", "sion", "ing"];
pub(crate) const PROCESS_WORDS: &[&str] = &["process", "procedure", "handling"];
pub(crate) const TYPE_WORDS: &[&str] = &["type", "kind", "category", "class", "sort of"];
pub(crate) const RESULT_SUFFIXES: &[&str] = &["ment"];
pub(crate) const RESULT_WORDS: &[&str] = &[
    "result",
    "outcome",
    "report",
    "certificate",
    "permit",
    "licence",
    "license",
    "verdict",
];
pub(crate) const INSTANCE_WORDS: &[&str] = &["instance", "specific", "particular", "individual"];

/// Minimum number of characters a word must keep in front of a suffix.
const MIN_STEM: usize = 3;

/// Quick classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickClassification {
    pub category: Category,
    pub justification: String,
}

pub fn classify_quick(term: &str) -> QuickClassification {
    let normalized = term.trim().to_lowercase();

    if let Some(suffix) = matching_suffix(&normalized, PROCESS_SUFFIXES) {
        return classified(
            Category::Process,
            format!("suffix '-{suffix}' marks an activity"),
        );
    }
    if let Some(word) = contained_word(&normalized, PROCESS_WORDS) {
        return classified(
            Category::Process,
            format!("contains '{word}' which names an activity"),
        );
    }
    if let Some(word) = contained_word(&normalized, TYPE_WORDS) {
        return classified(
            Category::Type,
            format!("contains '{word}' which names a kind of thing"),
        );
    }
    if let Some(suffix) = matching_suffix(&normalized, RESULT_SUFFIXES) {
        return classified(
            Category::Result,
            format!("suffix '-{suffix}' marks the outcome of an activity"),
        );
    }
    if let Some(word) = contained_word(&normalized, RESULT_WORDS) {
        return classified(
            Category::Result,
            format!("contains '{word}' which names an outcome"),
        );
    }
    if let Some(word) = contained_word(&normalized, INSTANCE_WORDS) {
        return classified(
            Category::Instance,
            format!("contains '{word}' which points at a single occurrence"),
        );
    }

    classified(
        Category::Type,
        "no lexical cue found; defaulting to type".to_string(),
    )
}

fn classified(category: Category, reason: String) -> QuickClassification {
    QuickClassification {
        category,
        justification: format!("{reason} ({category})"),
    }
}

/// Last word of the (lowercased) term.
pub(crate) fn head_word(normalized: &str) -> &str {
    normalized.split_whitespace().last().unwrap_or("")
}

/// Suffix of the term's last word, if the remaining stem is long enough.
pub(crate) fn matching_suffix<'a>(normalized: &str, suffixes: &[&'a str]) -> Option<&'a str> {
    let word = head_word(normalized);
    suffixes
        .iter()
        .copied()
        .find(|suffix| word.len() >= suffix.len() + MIN_STEM && word.ends_with(suffix))
}

pub(crate) fn contained_word<'a>(normalized: &str, words: &[&'a str]) -> Option<&'a str> {
    words.iter().copied().find(|word| normalized.contains(word))
}
