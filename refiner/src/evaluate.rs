//! Validation orchestrator: runs the applicable rules and aggregates a verdict.

use std::collections::BTreeMap;

use tracing::{info, instrument};

use crate::core::scoring::{
    category_compliance, derive_suggestions, is_acceptable, overall_score, status_score,
};
use crate::core::types::{
    Candidate, Category, OutcomeStatus, RuleId, ValidationOutcome, Verdict, Violation,
};
use crate::rules::{Rule, RuleConfig, RuleConfigs, RuleRegistry, Validator};

/// Evaluates candidates against a registry and its rule configurations.
///
/// Holds only shared references, so one evaluator can serve concurrent runs.
pub struct Evaluator<'a, R: Rule = Validator> {
    registry: &'a RuleRegistry<R>,
    configs: &'a RuleConfigs,
    acceptance_threshold: f64,
    rule_ids: Option<Vec<RuleId>>,
}

impl<'a, R: Rule> Evaluator<'a, R> {
    pub fn new(registry: &'a RuleRegistry<R>, configs: &'a RuleConfigs, acceptance_threshold: f64) -> Self {
        Self {
            registry,
            configs,
            acceptance_threshold,
            rule_ids: None,
        }
    }

    /// Evaluate exactly these rules instead of every compatible registered rule.
    pub fn with_rule_ids(mut self, rule_ids: Vec<RuleId>) -> Self {
        self.rule_ids = Some(rule_ids);
        self
    }

    /// Rule ids to evaluate for a candidate of `category`.
    ///
    /// An explicit id list is used as given, minus repeats; otherwise every registered rule
    /// compatible with the category, in registration order.
    pub fn applicable_rules(&self, category: Option<Category>) -> Vec<RuleId> {
        if let Some(rule_ids) = &self.rule_ids {
            let mut unique: Vec<RuleId> = Vec::with_capacity(rule_ids.len());
            for rule_id in rule_ids {
                if !unique.contains(rule_id) {
                    unique.push(rule_id.clone());
                }
            }
            return unique;
        }
        self.registry
            .get_all()
            .iter()
            .map(Rule::meta)
            .filter(|meta| meta.applies_to(category))
            .map(|meta| meta.id.clone())
            .collect()
    }

    #[instrument(skip_all, fields(term = %candidate.term, category = ?category))]
    pub fn evaluate(&self, candidate: &Candidate, category: Option<Category>) -> Verdict {
        let unconfigured = RuleConfig::default();
        let outcomes: Vec<_> = self
            .applicable_rules(category)
            .iter()
            .map(|rule_id| {
                let config = self.configs.get(rule_id).unwrap_or(&unconfigured);
                self.registry.validate_one(rule_id, candidate, config)
            })
            .collect();

        let mut rule_scores = BTreeMap::new();
        let mut passed = Vec::new();
        let mut failed = Vec::new();
        let mut warnings = Vec::new();
        for outcome in &outcomes {
            rule_scores.insert(outcome.rule_id.clone(), status_score(outcome.status));
            match outcome.status {
                OutcomeStatus::Pass => passed.push(outcome.rule_id.clone()),
                OutcomeStatus::Fail => failed.push(outcome.rule_id.clone()),
                OutcomeStatus::Warning => warnings.push(outcome.rule_id.clone()),
                OutcomeStatus::Info | OutcomeStatus::Skipped => {}
            }
        }

        let score = overall_score(&outcomes);
        let acceptable = is_acceptable(score, self.acceptance_threshold, &outcomes);
        info!(
            passed = passed.len(),
            failed = failed.len(),
            warnings = warnings.len(),
            score,
            acceptable,
            "evaluated candidate"
        );

        Verdict {
            overall_score: score,
            rule_scores,
            passed,
            failed,
            warnings,
            category,
            category_compliance: category_compliance(&outcomes, category),
            acceptable,
            suggestions: derive_suggestions(&outcomes),
            outcomes,
        }
    }

    /// Violations for every FAIL outcome of a registered rule.
    pub fn violations(&self, verdict: &Verdict) -> Vec<Violation> {
        verdict
            .outcomes
            .iter()
            .filter(|outcome| outcome.is_fail())
            .filter_map(|outcome| {
                self.registry
                    .get(&outcome.rule_id)
                    .map(|rule| rule.meta().violation(outcome))
            })
            .collect()
    }

    /// What already works in a verdict, as text the generator can keep.
    ///
    /// Markers and examples matched by passing rules come first, then the
    /// names of passing rules that matched nothing in particular. A marker
    /// already contained in a listed one is skipped.
    pub fn successful_elements(&self, verdict: &Verdict) -> Vec<String> {
        let passing: Vec<&ValidationOutcome> = verdict
            .outcomes
            .iter()
            .filter(|outcome| outcome.status == OutcomeStatus::Pass)
            .collect();

        let mut markers: Vec<&str> = Vec::new();
        for detected in passing.iter().filter_map(|outcome| outcome.detected.as_deref()) {
            let detected = detected.trim();
            if detected.is_empty() || markers.iter().any(|marker| marker.contains(detected)) {
                continue;
            }
            markers.retain(|marker| !detected.contains(marker));
            markers.push(detected);
        }

        let mut elements: Vec<String> = markers.iter().map(|marker| format!("'{marker}'")).collect();
        for outcome in passing.iter().filter(|outcome| outcome.detected.is_none()) {
            if let Some(rule) = self.registry.get(&outcome.rule_id) {
                let name = rule.meta().name.clone();
                if !elements.contains(&name) {
                    elements.push(name);
                }
            }
        }
        elements
    }
}
