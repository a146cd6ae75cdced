//! Content rules: forbidden wording and context leakage.

use anyhow::Result;

use crate::core::types::{Candidate, ValidationOutcome};
use crate::rules::matcher::{compile_patterns, first_match};
use crate::rules::{Rule, RuleConfig, RuleMeta, forbidden, match_examples};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentCheck {
    #[default]
    None,
    /// Context entries must stay implicit; naming one verbatim is a violation.
    ContextReference,
}

#[derive(Debug, Clone)]
pub struct ContentRule {
    meta: RuleMeta,
    check: ContentCheck,
}

impl ContentRule {
    pub fn new(meta: RuleMeta) -> Self {
        Self {
            meta,
            check: ContentCheck::None,
        }
    }

    pub fn with_check(mut self, check: ContentCheck) -> Self {
        self.check = check;
        self
    }
}

impl Rule for ContentRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn validate(&self, candidate: &Candidate, config: &RuleConfig) -> Result<ValidationOutcome> {
        if let Some(outcome) = match_examples(&self.meta, &candidate.text, config) {
            return Ok(outcome);
        }

        let patterns = compile_patterns(&self.meta.id, config.all_patterns());
        if let Some(hit) = first_match(&candidate.text, &patterns) {
            return Ok(
                forbidden(&self.meta, format!("forbidden phrasing '{}' found", hit.matched))
                    .with_detail(format!("pattern: {}", hit.pattern))
                    .with_detected(hit.matched),
            );
        }

        if self.check == ContentCheck::ContextReference {
            let text = candidate.text.to_lowercase();
            if let Some(reference) = candidate
                .context
                .references()
                .find(|reference| text.contains(&reference.to_lowercase()))
            {
                return Ok(forbidden(
                    &self.meta,
                    format!("explicit context reference '{reference}' found"),
                )
                .with_detected(reference));
            }
        }

        Ok(ValidationOutcome::pass(
            self.meta.id.clone(),
            "no forbidden content found",
        ))
    }
}
