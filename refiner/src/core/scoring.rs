//! Scoring model for rule outcomes.
//!
//! - PASS = 1.0, WARNING = 0.6, INFO/SKIPPED = 0.5, FAIL = 0.0.
//! - The overall score is the arithmetic mean over evaluated rules.
//! - Category compliance only looks at rules whose id carries the category code.

use crate::core::types::{Category, OutcomeStatus, ValidationOutcome};

/// Keyword cues scanned in FAIL messages and the suggestion each one yields.
const SUGGESTION_CUES: &[(&[&str], &str)] = &[
    (&["context"], "remove explicit context reference"),
    (&["source", "citation", "cite"], "add authoritative citation"),
    (&["sentence"], "collapse to one sentence"),
    (&["category", "categories"], "state ontological category explicitly"),
];

pub fn status_score(status: OutcomeStatus) -> f64 {
    match status {
        OutcomeStatus::Pass => 1.0,
        OutcomeStatus::Warning => 0.6,
        OutcomeStatus::Info | OutcomeStatus::Skipped => 0.5,
        OutcomeStatus::Fail => 0.0,
    }
}

/// Mean outcome score; `0.0` when nothing was evaluated.
pub fn overall_score(outcomes: &[ValidationOutcome]) -> f64 {
    mean(outcomes.iter().map(|outcome| status_score(outcome.status)))
}

/// Mean score over the rules whose id prefix matches the category code.
///
/// Vacuously `1.0` without a category or when no category rule was evaluated.
pub fn category_compliance(outcomes: &[ValidationOutcome], category: Option<Category>) -> f64 {
    let Some(category) = category else {
        return 1.0;
    };
    let scores: Vec<f64> = outcomes
        .iter()
        .filter(|outcome| outcome.rule_id.has_prefix(category.code()))
        .map(|outcome| status_score(outcome.status))
        .collect();
    if scores.is_empty() {
        return 1.0;
    }
    mean(scores.into_iter())
}

/// Acceptable iff the score reaches the threshold and no rule failed.
pub fn is_acceptable(overall_score: f64, threshold: f64, outcomes: &[ValidationOutcome]) -> bool {
    !outcomes.is_empty()
        && overall_score >= threshold
        && !outcomes.iter().any(ValidationOutcome::is_fail)
}

/// Derive suggestions from FAIL messages, deduplicated in first-occurrence order.
pub fn derive_suggestions(outcomes: &[ValidationOutcome]) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    for outcome in outcomes.iter().filter(|outcome| outcome.is_fail()) {
        let message = outcome.message.to_lowercase();
        for (cues, suggestion) in SUGGESTION_CUES {
            if cues.iter().any(|cue| message.contains(cue))
                && !suggestions.iter().any(|existing| existing == suggestion)
            {
                suggestions.push((*suggestion).to_string());
            }
        }
    }
    suggestions
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RuleId;

    fn outcome(id: &str, status: OutcomeStatus, message: &str) -> ValidationOutcome {
        ValidationOutcome::new(RuleId::from(id), status, message)
    }

    #[test]
    fn overall_score_is_mean_of_status_scores() {
        let outcomes = vec![
            outcome("A-01", OutcomeStatus::Pass, "ok"),
            outcome("A-02", OutcomeStatus::Pass, "ok"),
            outcome("A-03", OutcomeStatus::Fail, "bad"),
        ];
        let score = overall_score(&outcomes);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn overall_score_of_nothing_is_zero_and_not_acceptable() {
        assert_eq!(overall_score(&[]), 0.0);
        assert!(!is_acceptable(0.0, 0.0, &[]));
    }

    #[test]
    fn warning_and_skipped_have_partial_weight() {
        let outcomes = vec![
            outcome("A-01", OutcomeStatus::Warning, "soft"),
            outcome("A-02", OutcomeStatus::Skipped, "none"),
        ];
        assert!((overall_score(&outcomes) - 0.55).abs() < 1e-9);
    }

    #[test]
    fn acceptable_requires_zero_failures() {
        let outcomes = vec![
            outcome("A-01", OutcomeStatus::Pass, "ok"),
            outcome("A-02", OutcomeStatus::Fail, "bad"),
        ];
        assert!(!is_acceptable(0.9, 0.5, &outcomes));
        assert!(is_acceptable(1.0, 0.8, &outcomes[..1]));
    }

    #[test]
    fn compliance_is_vacuous_without_category_rules() {
        let outcomes = vec![outcome("CON-01", OutcomeStatus::Fail, "bad")];
        assert_eq!(category_compliance(&outcomes, Some(Category::Process)), 1.0);
        assert_eq!(category_compliance(&outcomes, None), 1.0);
    }

    #[test]
    fn compliance_uses_category_prefixed_rules() {
        let outcomes = vec![
            outcome("PRO-01", OutcomeStatus::Pass, "ok"),
            outcome("PRO-02", OutcomeStatus::Fail, "bad"),
            outcome("RES-01", OutcomeStatus::Fail, "bad"),
        ];
        assert_eq!(category_compliance(&outcomes, Some(Category::Process)), 0.5);
    }

    #[test]
    fn suggestions_follow_cues_and_deduplicate() {
        let outcomes = vec![
            outcome("CON-01", OutcomeStatus::Fail, "explicit context reference 'X' found"),
            outcome("STR-02", OutcomeStatus::Fail, "definition spans 2 sentences"),
            outcome("CON-03", OutcomeStatus::Fail, "context named twice"),
            outcome("CON-02", OutcomeStatus::Fail, "required element missing: authoritative source"),
            outcome("ESS-02", OutcomeStatus::Pass, "category 'process' marker found"),
        ];
        assert_eq!(
            derive_suggestions(&outcomes),
            vec![
                "remove explicit context reference".to_string(),
                "collapse to one sentence".to_string(),
                "add authoritative citation".to_string(),
            ]
        );
    }
}
