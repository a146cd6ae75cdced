//! Registry of validators keyed by rule id.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::core::types::{Candidate, RuleId, ValidationOutcome};
use crate::error::RefineError;
use crate::rules::{Rule, RuleConfig, RuleConfigs, Validator};

/// Validators in registration order, indexed by rule id.
///
/// Read-only during evaluation, so one registry can be shared by reference
/// across concurrent runs.
#[derive(Debug)]
pub struct RuleRegistry<R: Rule = Validator> {
    rules: Vec<R>,
    index: HashMap<RuleId, usize>,
}

impl<R: Rule> Default for RuleRegistry<R> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<R: Rule> RuleRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. A rule with the same id is replaced in place.
    pub fn register(&mut self, rule: impl Into<R>) {
        let rule = rule.into();
        let id = rule.meta().id.clone();
        match self.index.get(&id) {
            Some(&position) => {
                debug!(rule_id = %id, "replacing registered rule");
                self.rules[position] = rule;
            }
            None => {
                self.index.insert(id, self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    pub fn get(&self, rule_id: &RuleId) -> Option<&R> {
        self.index.get(rule_id).map(|&position| &self.rules[position])
    }

    /// All rules in registration order.
    pub fn get_all(&self) -> &[R] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate one rule. Never fails: unknown ids are skipped and rule errors
    /// become FAIL outcomes.
    pub fn validate_one(
        &self,
        rule_id: &RuleId,
        candidate: &Candidate,
        config: &RuleConfig,
    ) -> ValidationOutcome {
        let Some(rule) = self.get(rule_id) else {
            return ValidationOutcome::skipped(
                rule_id.clone(),
                format!("no validator registered for rule {rule_id}"),
            );
        };
        match rule.validate(candidate, config) {
            Ok(outcome) => outcome,
            Err(err) => {
                let err = RefineError::RuleExecution {
                    rule_id: rule_id.clone(),
                    message: format!("{err:#}"),
                };
                warn!(error = %err, "rule failed");
                ValidationOutcome::fail(rule_id.clone(), err.to_string())
            }
        }
    }

    /// One outcome per rule id in `configs`, in rule id order.
    pub fn validate_all(&self, candidate: &Candidate, configs: &RuleConfigs) -> Vec<ValidationOutcome> {
        configs
            .iter()
            .map(|(rule_id, config)| self.validate_one(rule_id, candidate, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OutcomeStatus, Severity, ViolationType};
    use crate::rules::{RuleMeta, StructuralRule};
    use crate::test_support::FailingRule;

    fn structural(id: &str, name: &str) -> StructuralRule {
        StructuralRule::new(RuleMeta::new(
            id,
            name,
            Severity::Medium,
            ViolationType::StructureIssue,
        ))
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let mut registry: RuleRegistry = RuleRegistry::new();
        registry.register(structural("STR-01", "first"));
        registry.register(structural("STR-02", "second"));
        registry.register(structural("STR-01", "replacement"));

        assert_eq!(registry.len(), 2);
        let names: Vec<&str> = registry
            .get_all()
            .iter()
            .map(|rule| rule.meta().name.as_str())
            .collect();
        assert_eq!(names, vec!["replacement", "second"]);
    }

    #[test]
    fn unregistered_rule_is_skipped() {
        let registry: RuleRegistry = RuleRegistry::new();
        let mut configs = RuleConfigs::new();
        configs.insert(RuleId::from("XYZ-99"), RuleConfig::default());

        let outcomes = registry.validate_all(&Candidate::new("t", "text"), &configs);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, OutcomeStatus::Skipped);
        assert_eq!(outcomes[0].message, "no validator registered for rule XYZ-99");
    }

    #[test]
    fn failing_rule_does_not_abort_the_batch() {
        let mut registry: RuleRegistry<FailingRule> = RuleRegistry::new();
        registry.register(FailingRule::new("BRK-01", "pattern engine exploded"));
        let mut configs = RuleConfigs::new();
        configs.insert(RuleId::from("BRK-01"), RuleConfig::default());
        configs.insert(RuleId::from("BRK-02"), RuleConfig::default());

        let outcomes = registry.validate_all(&Candidate::new("t", "text"), &configs);
        assert_eq!(outcomes[0].status, OutcomeStatus::Fail);
        assert!(outcomes[0].message.contains("pattern engine exploded"));
        assert_eq!(outcomes[1].status, OutcomeStatus::Skipped);
    }
}
