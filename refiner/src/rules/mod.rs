//! Rule validators and the registry that holds them.
//!
//! Validators are a closed set of rule families behind one [`Rule`] trait:
//!
//! - [`StructuralRule`]: shape of the sentence. Matching patterns are violations.
//! - [`EssentialRule`]: required markers. Matching patterns satisfy the rule.
//! - [`ContentRule`]: wording and context. Matching patterns are violations.
//!
//! Every family resolves explicit examples first, then patterns, then its own
//! fallback outcome.

pub mod builtin;
pub mod config;
pub mod content;
pub mod essential;
pub mod matcher;
pub mod registry;
pub mod structural;

use anyhow::Result;

use crate::core::types::{
    Candidate, Category, RuleId, Severity, ValidationOutcome, Violation, ViolationType,
};

pub use config::{RuleConfig, RuleConfigs};
pub use content::{ContentCheck, ContentRule};
pub use essential::EssentialRule;
pub use registry::RuleRegistry;
pub use structural::{StructuralCheck, StructuralRule};

/// Static description of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMeta {
    pub id: RuleId,
    pub name: String,
    pub severity: Severity,
    pub violation_type: ViolationType,
    /// Categories the rule applies to. Empty means all categories.
    pub categories: Vec<Category>,
    /// Remediation hint carried into violations.
    pub hint: Option<String>,
}

impl RuleMeta {
    pub fn new(
        id: impl Into<RuleId>,
        name: impl Into<String>,
        severity: Severity,
        violation_type: ViolationType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            severity,
            violation_type,
            categories: Vec::new(),
            hint: None,
        }
    }

    pub fn for_categories(mut self, categories: &[Category]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Whether the rule should run for candidates of `category`.
    pub fn applies_to(&self, category: Option<Category>) -> bool {
        match category {
            None => true,
            Some(category) => self.categories.is_empty() || self.categories.contains(&category),
        }
    }

    /// Build the violation record for a failed outcome of this rule.
    pub fn violation(&self, outcome: &ValidationOutcome) -> Violation {
        Violation {
            rule_id: self.id.clone(),
            rule_name: self.name.clone(),
            violation_type: self.violation_type,
            severity: self.severity,
            description: outcome.message.clone(),
            detected_pattern: outcome.detected.clone(),
            suggestion: self.hint.clone(),
        }
    }
}

/// One deterministic check over a candidate.
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    /// Evaluate `candidate` with the rule's configuration.
    ///
    /// An `Err` means the rule itself broke; the registry turns it into a FAIL
    /// outcome for this rule only.
    fn validate(&self, candidate: &Candidate, config: &RuleConfig) -> Result<ValidationOutcome>;
}

/// The closed set of rule families.
#[derive(Debug, Clone)]
pub enum Validator {
    Structural(StructuralRule),
    Essential(EssentialRule),
    Content(ContentRule),
}

impl Rule for Validator {
    fn meta(&self) -> &RuleMeta {
        match self {
            Validator::Structural(rule) => rule.meta(),
            Validator::Essential(rule) => rule.meta(),
            Validator::Content(rule) => rule.meta(),
        }
    }

    fn validate(&self, candidate: &Candidate, config: &RuleConfig) -> Result<ValidationOutcome> {
        match self {
            Validator::Structural(rule) => rule.validate(candidate, config),
            Validator::Essential(rule) => rule.validate(candidate, config),
            Validator::Content(rule) => rule.validate(candidate, config),
        }
    }
}

impl From<StructuralRule> for Validator {
    fn from(rule: StructuralRule) -> Self {
        Validator::Structural(rule)
    }
}

impl From<EssentialRule> for Validator {
    fn from(rule: EssentialRule) -> Self {
        Validator::Essential(rule)
    }
}

impl From<ContentRule> for Validator {
    fn from(rule: ContentRule) -> Self {
        Validator::Content(rule)
    }
}

/// Resolve explicit examples: bad examples fail, good examples pass.
///
/// Base lists are consulted before per-category variants.
pub(crate) fn match_examples(
    meta: &RuleMeta,
    text: &str,
    config: &RuleConfig,
) -> Option<ValidationOutcome> {
    let bad_lists = std::iter::once(&config.bad_examples).chain(
        config
            .per_category
            .values()
            .map(|variant| &variant.bad_examples),
    );
    for examples in bad_lists {
        if let Some(example) = matcher::find_example(text, examples) {
            return Some(
                ValidationOutcome::fail(
                    meta.id.clone(),
                    format!("matches explicit bad example '{example}'"),
                )
                .with_detected(example),
            );
        }
    }

    if let Some(example) = matcher::find_example(text, &config.good_examples) {
        return Some(
            ValidationOutcome::pass(
                meta.id.clone(),
                format!("matches explicit good example '{example}'"),
            )
            .with_detected(example),
        );
    }
    for (category, variant) in &config.per_category {
        if let Some(example) = matcher::find_example(text, &variant.good_examples) {
            return Some(
                ValidationOutcome::pass(
                    meta.id.clone(),
                    format!("matches explicit good example '{example}' for category '{category}'"),
                )
                .with_detected(example)
                .with_categories(vec![*category]),
            );
        }
    }
    None
}

/// Outcome for a violated prohibition: WARNING for low-severity rules, FAIL otherwise.
pub(crate) fn forbidden(meta: &RuleMeta, message: impl Into<String>) -> ValidationOutcome {
    if meta.severity == Severity::Low {
        ValidationOutcome::warning(meta.id.clone(), message)
    } else {
        ValidationOutcome::fail(meta.id.clone(), message)
    }
}
