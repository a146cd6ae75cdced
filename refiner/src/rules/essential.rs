//! Essential rules: elements a definition must contain.
//!
//! A matching pattern is the required marker. When patterns are grouped per
//! category the rule succeeds only if exactly one category group matches, or
//! when the caller supplies a valid authoritative category override.

use anyhow::Result;

use crate::core::types::{Candidate, Category, ValidationOutcome};
use crate::rules::matcher::{compile_patterns, first_match};
use crate::rules::{Rule, RuleConfig, RuleMeta, match_examples};

#[derive(Debug, Clone)]
pub struct EssentialRule {
    meta: RuleMeta,
}

impl EssentialRule {
    pub fn new(meta: RuleMeta) -> Self {
        Self { meta }
    }

    fn validate_override(&self, raw: &str) -> ValidationOutcome {
        match Category::parse(raw) {
            Some(category) => ValidationOutcome::pass(
                self.meta.id.clone(),
                format!("category '{category}' set by authoritative override"),
            )
            .with_categories(vec![category]),
            None => ValidationOutcome::fail(
                self.meta.id.clone(),
                format!(
                    "invalid category override '{}': expected one of {}",
                    raw.trim(),
                    category_list(&Category::ALL)
                ),
            ),
        }
    }

    fn validate_categories(&self, text: &str, config: &RuleConfig) -> ValidationOutcome {
        let mut checked = Vec::new();
        let mut matched = Vec::new();
        let mut detected = Vec::new();
        for (category, patterns) in config.category_patterns() {
            checked.push(category);
            let compiled = compile_patterns(&self.meta.id, patterns);
            if let Some(hit) = first_match(text, &compiled) {
                matched.push(category);
                detected.push(hit.matched);
            }
        }

        match matched.len() {
            0 => ValidationOutcome::fail(
                self.meta.id.clone(),
                format!(
                    "no category marker found (checked: {})",
                    category_list(&checked)
                ),
            ),
            1 => ValidationOutcome::pass(
                self.meta.id.clone(),
                format!("category '{}' marker found", matched[0]),
            )
            .with_detected(detected.remove(0))
            .with_categories(matched),
            _ => ValidationOutcome::fail(
                self.meta.id.clone(),
                format!("ambiguous category markers: matched {}", category_list(&matched)),
            )
            .with_detail(format!("markers: {}", detected.join(", ")))
            .with_categories(matched),
        }
    }

    fn validate_marker(&self, text: &str, config: &RuleConfig) -> ValidationOutcome {
        if config.is_empty() {
            return ValidationOutcome::info(self.meta.id.clone(), "no patterns configured");
        }
        let compiled = compile_patterns(&self.meta.id, &config.patterns);
        match first_match(text, &compiled) {
            Some(hit) => ValidationOutcome::pass(
                self.meta.id.clone(),
                format!("required marker '{}' found", hit.matched),
            )
            .with_detected(hit.matched),
            None => ValidationOutcome::fail(
                self.meta.id.clone(),
                format!("required element missing: {}", self.meta.name),
            ),
        }
    }
}

fn category_list(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|category| category.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Rule for EssentialRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn validate(&self, candidate: &Candidate, config: &RuleConfig) -> Result<ValidationOutcome> {
        if let Some(outcome) = match_examples(&self.meta, &candidate.text, config) {
            return Ok(outcome);
        }

        if !config.is_multi_category() {
            return Ok(self.validate_marker(&candidate.text, config));
        }

        if let Some(raw) = candidate.context.category_override.as_deref() {
            return Ok(self.validate_override(raw));
        }
        Ok(self.validate_categories(&candidate.text, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CandidateContext, OutcomeStatus, Severity, ViolationType};
    use crate::rules::config::CategoryVariant;

    fn rule() -> EssentialRule {
        EssentialRule::new(RuleMeta::new(
            "R-02",
            "ontological category",
            Severity::High,
            ViolationType::MissingElement,
        ))
    }

    fn category_config() -> RuleConfig {
        let mut config = RuleConfig::default();
        let groups = [
            (Category::Type, "\\bkind of\\b"),
            (Category::Process, "\\bactivity\\b"),
            (Category::Result, "\\boutcome of\\b"),
            (Category::Instance, "\\bspecific\\b"),
        ];
        for (category, pattern) in groups {
            config.per_category.insert(
                category,
                CategoryVariant {
                    patterns: vec![pattern.to_string()],
                    ..CategoryVariant::default()
                },
            );
        }
        config
    }

    #[test]
    fn explicit_bad_example_fails() {
        let config = RuleConfig {
            bad_examples: vec!["is a process of".to_string()],
            ..category_config()
        };
        let candidate = Candidate::new("registration", "Registration is a process of recording owners");
        let outcome = rule().validate(&candidate, &config).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Fail);
        assert_eq!(outcome.message, "matches explicit bad example 'is a process of'");
    }

    #[test]
    fn single_category_group_passes_naming_category() {
        let candidate = Candidate::new("registration", "activity in which an owner is recorded");
        let outcome = rule().validate(&candidate, &category_config()).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Pass);
        assert_eq!(outcome.message, "category 'process' marker found");
        assert_eq!(outcome.categories, vec![Category::Process]);
    }

    #[test]
    fn two_category_groups_fail_as_ambiguous() {
        let candidate = Candidate::new(
            "registration",
            "activity whose outcome of recording is a register entry",
        );
        let outcome = rule().validate(&candidate, &category_config()).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Fail);
        assert!(outcome.message.contains("ambiguous"));
        assert!(outcome.message.contains("process"));
        assert!(outcome.message.contains("result"));
        assert_eq!(outcome.categories, vec![Category::Process, Category::Result]);
    }

    #[test]
    fn no_category_group_fails_listing_checked_categories() {
        let candidate = Candidate::new("registration", "entry in a register");
        let outcome = rule().validate(&candidate, &category_config()).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Fail);
        assert_eq!(
            outcome.message,
            "no category marker found (checked: type, process, result, instance)"
        );
    }

    #[test]
    fn valid_override_short_circuits_patterns() {
        let candidate = Candidate::new("registration", "activity whose outcome of recording")
            .with_context(CandidateContext {
                category_override: Some(" Result ".to_string()),
                ..CandidateContext::default()
            });
        let outcome = rule().validate(&candidate, &category_config()).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Pass);
        assert_eq!(outcome.categories, vec![Category::Result]);
    }

    #[test]
    fn invalid_override_fails_with_vocabulary() {
        let candidate = Candidate::new("registration", "activity").with_context(CandidateContext {
            category_override: Some("event".to_string()),
            ..CandidateContext::default()
        });
        let outcome = rule().validate(&candidate, &category_config()).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Fail);
        assert_eq!(
            outcome.message,
            "invalid category override 'event': expected one of type, process, result, instance"
        );
    }

    #[test]
    fn single_marker_rule_outcomes() {
        let source_rule = EssentialRule::new(RuleMeta::new(
            "CON-02",
            "authoritative source",
            Severity::Medium,
            ViolationType::MissingElement,
        ));
        let config = RuleConfig {
            patterns: vec!["\\barticle\\s+\\d+".to_string()],
            ..RuleConfig::default()
        };

        let cited = Candidate::new("permit", "consent under Article 2 of the act");
        let outcome = source_rule.validate(&cited, &config).expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Pass);

        let uncited = Candidate::new("permit", "consent to build");
        let outcome = source_rule.validate(&uncited, &config).expect("validate");
        assert_eq!(outcome.message, "required element missing: authoritative source");

        let outcome = source_rule
            .validate(&uncited, &RuleConfig::default())
            .expect("validate");
        assert_eq!(outcome.status, OutcomeStatus::Info);
    }
}
