//! Example and pattern matching shared by all rule families.
//!
//! Matching is case-insensitive throughout. Patterns that fail to compile are
//! skipped and logged, so a broken pattern behaves like one that never matches.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::core::types::RuleId;
use crate::error::RefineError;

/// First example that occurs in `text` as a case-insensitive substring.
pub fn find_example<'a>(text: &str, examples: &'a [String]) -> Option<&'a str> {
    let haystack = text.to_lowercase();
    examples
        .iter()
        .map(|example| example.trim())
        .filter(|example| !example.is_empty())
        .find(|example| haystack.contains(&example.to_lowercase()))
}

/// A compiled pattern alongside its source text.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub source: String,
    pub regex: Regex,
}

/// A pattern hit: the configured pattern and the matched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub pattern: String,
    pub matched: String,
}

/// Compile patterns case-insensitively, skipping the malformed ones.
pub fn compile_patterns<'a>(
    rule_id: &RuleId,
    patterns: impl IntoIterator<Item = &'a String>,
) -> Vec<CompiledPattern> {
    patterns
        .into_iter()
        .filter_map(|pattern| {
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(regex) => Some(CompiledPattern {
                    source: pattern.clone(),
                    regex,
                }),
                Err(err) => {
                    let err = RefineError::InvalidPattern {
                        rule_id: rule_id.clone(),
                        pattern: pattern.clone(),
                        message: err.to_string(),
                    };
                    warn!(error = %err, "skipping pattern");
                    None
                }
            }
        })
        .collect()
}

/// First pattern (in configuration order) that matches `text`.
pub fn first_match(text: &str, patterns: &[CompiledPattern]) -> Option<PatternMatch> {
    patterns.iter().find_map(|pattern| {
        pattern.regex.find(text).map(|found| PatternMatch {
            pattern: pattern.source.clone(),
            matched: found.as_str().to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn examples_match_case_insensitively() {
        let examples = strings(&["  ", "Tax Office"]);
        assert_eq!(
            find_example("registered by the tax office", &examples),
            Some("Tax Office")
        );
        assert_eq!(find_example("registered", &examples), None);
    }

    #[test]
    fn malformed_patterns_are_skipped() {
        let id = RuleId::from("R-01");
        let patterns = strings(&["(unclosed", "activity"]);
        let compiled = compile_patterns(&id, &patterns);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].source, "activity");
    }

    #[test]
    fn first_match_reports_pattern_and_text() {
        let id = RuleId::from("R-01");
        let patterns = strings(&["^(is|are)\\b", "\\bin order to\\b"]);
        let compiled = compile_patterns(&id, &patterns);
        let found = first_match("Data kept In Order To audit", &compiled).expect("match");
        assert_eq!(found.pattern, "\\bin order to\\b");
        assert_eq!(found.matched, "In Order To");
    }
}
