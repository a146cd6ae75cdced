//! Structural rules: the shape of the definition sentence.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::core::types::{Candidate, ValidationOutcome};
use crate::rules::matcher::{compile_patterns, first_match};
use crate::rules::{Rule, RuleConfig, RuleMeta, forbidden, match_examples};

/// Sentence boundary: terminal punctuation followed by a capitalized word.
static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+[A-Z]").expect("sentence break regex"));

/// Built-in check run after pattern matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructuralCheck {
    #[default]
    None,
    /// The definition must be exactly one sentence.
    SingleSentence,
    /// The defined term must not appear in its own definition.
    NoTermRepetition,
}

#[derive(Debug, Clone)]
pub struct StructuralRule {
    meta: RuleMeta,
    check: StructuralCheck,
}

impl StructuralRule {
    pub fn new(meta: RuleMeta) -> Self {
        Self {
            meta,
            check: StructuralCheck::None,
        }
    }

    pub fn with_check(mut self, check: StructuralCheck) -> Self {
        self.check = check;
        self
    }

    fn run_check(&self, candidate: &Candidate) -> Result<Option<ValidationOutcome>> {
        match self.check {
            StructuralCheck::None => Ok(None),
            StructuralCheck::SingleSentence => {
                let sentences = sentence_count(&candidate.text);
                if sentences > 1 {
                    return Ok(Some(forbidden(
                        &self.meta,
                        format!("definition spans {sentences} sentences"),
                    )));
                }
                Ok(None)
            }
            StructuralCheck::NoTermRepetition => {
                let term = candidate.term.trim();
                if term.is_empty() {
                    return Ok(None);
                }
                let term_re = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("build term pattern for '{term}'"))?;
                Ok(term_re.find(&candidate.text).map(|found| {
                    forbidden(
                        &self.meta,
                        format!("term '{term}' is repeated in its own definition"),
                    )
                    .with_detected(found.as_str())
                }))
            }
        }
    }
}

/// Number of sentences in `text`; `0` for blank text.
pub fn sentence_count(text: &str) -> usize {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }
    SENTENCE_BREAK.find_iter(text).count() + 1
}

impl Rule for StructuralRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn validate(&self, candidate: &Candidate, config: &RuleConfig) -> Result<ValidationOutcome> {
        if let Some(outcome) = match_examples(&self.meta, &candidate.text, config) {
            return Ok(outcome);
        }

        let patterns = compile_patterns(&self.meta.id, config.all_patterns());
        if let Some(hit) = first_match(&candidate.text, &patterns) {
            return Ok(forbidden(
                &self.meta,
                format!("forbidden structure '{}' matched", hit.matched),
            )
            .with_detail(format!("pattern: {}", hit.pattern))
            .with_detected(hit.matched));
        }

        if let Some(outcome) = self.run_check(candidate)? {
            return Ok(outcome);
        }

        Ok(ValidationOutcome::pass(
            self.meta.id.clone(),
            "no structural issue found",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OutcomeStatus, Severity, ViolationType};

    fn rule(check: StructuralCheck) -> StructuralRule {
        StructuralRule::new(RuleMeta::new(
            "STR-01",
            "structure",
            Severity::Medium,
            ViolationType::StructureIssue,
        ))
        .with_check(check)
    }

    fn config(patterns: &[&str]) -> RuleConfig {
        RuleConfig {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            ..RuleConfig::default()
        }
    }

    #[test]
    fn matching_pattern_is_a_violation() {
        let candidate = Candidate::new("permit", "Is a document allowing construction");
        let outcome = rule(StructuralCheck::None)
            .validate(&candidate, &config(&["^(is|are)\\b"]))
            .expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Fail);
        assert_eq!(outcome.detected.as_deref(), Some("Is"));
    }

    #[test]
    fn nothing_matched_passes() {
        let candidate = Candidate::new("permit", "document allowing construction");
        let outcome = rule(StructuralCheck::None)
            .validate(&candidate, &config(&["^(is|are)\\b"]))
            .expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Pass);
    }

    #[test]
    fn single_sentence_check_counts_sentences() {
        let candidate = Candidate::new("permit", "Document allowing work. It is issued by a body.");
        let outcome = rule(StructuralCheck::SingleSentence)
            .validate(&candidate, &RuleConfig::default())
            .expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Fail);
        assert_eq!(outcome.message, "definition spans 2 sentences");

        assert_eq!(sentence_count("Document issued under art. 5 of the act."), 1);
        assert_eq!(sentence_count("   "), 0);
    }

    #[test]
    fn term_repetition_is_detected_on_word_boundaries() {
        let check = rule(StructuralCheck::NoTermRepetition);
        let repeated = Candidate::new("permit", "written Permit allowing work");
        let outcome = check.validate(&repeated, &RuleConfig::default()).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Fail);
        assert_eq!(outcome.detected.as_deref(), Some("Permit"));

        let clean = Candidate::new("permit", "written permission allowing work");
        let outcome = check.validate(&clean, &RuleConfig::default()).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Pass);
    }

    #[test]
    fn good_example_short_circuits_patterns() {
        let candidate = Candidate::new("permit", "Is a document allowing construction");
        let config = RuleConfig {
            good_examples: vec!["document allowing".to_string()],
            ..config(&["^is\\b"])
        };
        let outcome = rule(StructuralCheck::None)
            .validate(&candidate, &config)
            .expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Pass);
    }
}
