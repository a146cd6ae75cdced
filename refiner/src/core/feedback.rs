//! Feedback synthesis for the next generation attempt.
//!
//! Converts violations plus the score history of a run into a short,
//! prioritized, deduplicated list of instructions:
//!
//! 1. CRITICAL violations (capped), each with its remediation template.
//! 2. One message per violation type for the rest.
//! 3. Regression / stagnation notes from the score history.
//! 4. At most one "retain these elements" note.
//! 5. Ordering: CRITICAL, then concrete replacements/suggestions, then the rest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{Category, RuleId, Severity, Violation, ViolationType};

const CRITICAL_PREFIX: &str = "CRITICAL";
const LISTED_ITEMS: usize = 3;

/// Limits applied when building feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackLimits {
    /// Maximum number of feedback items per iteration.
    pub max_items: usize,
    /// Maximum number of CRITICAL violations surfaced individually.
    pub critical_cap: usize,
    /// Two scores closer than this count as stagnation.
    pub stagnation_epsilon: f64,
}

impl Default for FeedbackLimits {
    fn default() -> Self {
        Self {
            max_items: 5,
            critical_cap: 3,
            stagnation_epsilon: 0.01,
        }
    }
}

/// What the run has learned so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackHistory<'a> {
    /// Scores of all iterations so far, including the current one.
    pub scores: &'a [f64],
    /// Elements that already pass and should be kept.
    pub successful_elements: &'a [String],
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackBuilder {
    limits: FeedbackLimits,
}

impl FeedbackBuilder {
    pub fn new(limits: FeedbackLimits) -> Self {
        Self { limits }
    }

    pub fn build(
        &self,
        violations: &[Violation],
        history: &FeedbackHistory<'_>,
        iteration: u32,
    ) -> Vec<String> {
        let mut items = Vec::new();

        let (critical, rest): (Vec<&Violation>, Vec<&Violation>) = violations
            .iter()
            .partition(|violation| violation.severity == Severity::Critical);
        let surfaced = critical.len().min(self.limits.critical_cap);
        for violation in &critical[..surfaced] {
            items.push(critical_item(violation, history.category));
        }

        let mut groups: BTreeMap<ViolationType, Vec<&Violation>> = BTreeMap::new();
        for violation in critical[surfaced..].iter().chain(&rest) {
            groups
                .entry(violation.violation_type)
                .or_default()
                .push(violation);
        }
        for (violation_type, group) in &groups {
            items.push(group_item(*violation_type, group, iteration, history.category));
        }

        items.extend(self.learning_notes(history.scores));

        if !history.successful_elements.is_empty() {
            let kept: Vec<&str> = history
                .successful_elements
                .iter()
                .take(LISTED_ITEMS)
                .map(String::as_str)
                .collect();
            items.push(format!(
                "Retain these elements that already pass: {}.",
                kept.join(", ")
            ));
        }

        self.prioritize(items)
    }

    fn learning_notes(&self, scores: &[f64]) -> Vec<String> {
        let mut notes = Vec::new();
        let [.., previous, current] = scores else {
            return notes;
        };
        if current <= previous {
            notes.push(format!(
                "Score did not improve ({previous:.2} -> {current:.2}); undo the changes that introduced new violations."
            ));
        }
        if (current - previous).abs() < self.limits.stagnation_epsilon {
            notes.push(format!(
                "Scores have stagnated around {current:.2}; try a fundamentally different formulation instead of small edits."
            ));
        }
        notes
    }

    fn prioritize(&self, items: Vec<String>) -> Vec<String> {
        let mut ordered = items;
        ordered.sort_by_key(|item| priority(item));

        let mut unique: Vec<String> = Vec::with_capacity(ordered.len());
        for item in ordered {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        unique.truncate(self.limits.max_items);
        unique
    }
}

fn priority(item: &str) -> u8 {
    if item.starts_with(CRITICAL_PREFIX) {
        0
    } else if item.contains("Suggestion:") || item.contains("Replace") {
        1
    } else {
        2
    }
}

fn critical_item(violation: &Violation, category: Option<Category>) -> String {
    let mut item = format!(
        "{CRITICAL_PREFIX} {}: {}",
        violation.rule_id,
        remediation(&violation.rule_id, category)
    );
    if let Some(suggestion) = &violation.suggestion {
        item.push_str(" Suggestion: ");
        item.push_str(suggestion);
    }
    item
}

fn group_item(
    violation_type: ViolationType,
    group: &[&Violation],
    iteration: u32,
    category: Option<Category>,
) -> String {
    match violation_type {
        ViolationType::ForbiddenPattern => {
            let patterns = distinct(group.iter().map(|violation| {
                violation
                    .detected_pattern
                    .as_deref()
                    .unwrap_or(violation.description.as_str())
            }));
            let quoted: Vec<String> = patterns.iter().map(|p| format!("'{p}'")).collect();
            if iteration <= 1 {
                format!("Avoid these phrasings: {}.", quoted.join(", "))
            } else {
                format!(
                    "Still present after {} attempt(s): {}. Replace them with neutral wording.",
                    iteration - 1,
                    quoted.join(", ")
                )
            }
        }
        ViolationType::MissingElement => {
            let missing = missing_names(group);
            format!("Add the missing elements: {}.", missing.join("; "))
        }
        ViolationType::StructureIssue => {
            let ids = rule_ids(group);
            if iteration <= 1 {
                format!(
                    "Structure ({ids}): write one sentence that opens with the genus noun followed by the distinguishing features."
                )
            } else {
                format!(
                    "Structure ({ids}) is still off after {} attempt(s): rebuild the sentence as '<genus> that <distinguishing features>' instead of patching it.",
                    iteration - 1
                )
            }
        }
        ViolationType::ContentIssue | ViolationType::ClarityIssue => {
            let first = &group[0].rule_id;
            let mut item = format!("{first}: {}", remediation(first, category));
            if group.len() > 1 {
                let others: Vec<&str> = group[1..]
                    .iter()
                    .map(|violation| violation.rule_id.as_str())
                    .collect();
                item.push_str(&format!(" Also check {}.", others.join(", ")));
            }
            item
        }
    }
}

fn missing_names(group: &[&Violation]) -> Vec<String> {
    distinct(group.iter().map(|violation| violation.rule_name.as_str()))
}

fn rule_ids(group: &[&Violation]) -> String {
    distinct(group.iter().map(|violation| violation.rule_id.as_str())).join(", ")
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if seen.len() == LISTED_ITEMS {
            break;
        }
        if !seen.iter().any(|existing| existing == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

/// Phrase a definition of the given category should open with.
pub fn category_phrase(category: Category) -> &'static str {
    match category {
        Category::Type => "'kind of <genus> that ...'",
        Category::Process => "'activity in which <actor> ...'",
        Category::Result => "'outcome of <process> that ...'",
        Category::Instance => "'specific <genus> identified by ...'",
    }
}

/// Static remediation template for a rule id.
pub fn remediation(rule_id: &RuleId, category: Option<Category>) -> String {
    match rule_id.as_str() {
        "CON-01" => "Remove the explicit reference to the organisational or legal context; the context is implied.".to_string(),
        "CON-02" => "Ground the definition in an authoritative source, e.g. cite the governing act or article.".to_string(),
        "ESS-01" => "Describe what the term is, not what it is for; drop purpose clauses such as 'in order to'.".to_string(),
        "ESS-02" => match category {
            Some(category) => format!(
                "State the ontological category explicitly: open with {} ({category}).",
                category_phrase(category)
            ),
            None => "State the ontological category explicitly (type, process, result or instance).".to_string(),
        },
        "STR-01" => "Start with the genus noun; do not open with an article, a verb or the term itself.".to_string(),
        "STR-02" => "Collapse the definition into exactly one sentence.".to_string(),
        "INT-01" => "Do not repeat the term in its own definition; describe it in other words.".to_string(),
        "PRO-01" => format!("Describe the activity: who acts and what happens, opening with {}.", category_phrase(Category::Process)),
        "RES-01" => format!("Name the process that produces this outcome, opening with {}.", category_phrase(Category::Result)),
        "TYP-01" => format!("Name the genus and what sets this kind apart, opening with {}.", category_phrase(Category::Type)),
        "INS-01" => format!("Say how this single occurrence is identified, opening with {}.", category_phrase(Category::Instance)),
        other => format!("Resolve the issue reported by rule {other}."),
    }
}
