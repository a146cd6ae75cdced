//! Per-rule configuration: examples and patterns.
//!
//! The JSON shape is flat. Base lists use `good_examples`, `bad_examples` and
//! `patterns`; per-category variants append the category name, e.g.
//! `patterns_process` or `good_examples_type`. Unknown keys are ignored and
//! missing keys default to empty lists.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::core::types::{Category, RuleId};

/// Configuration of every rule that should be evaluated, keyed by rule id.
pub type RuleConfigs = BTreeMap<RuleId, RuleConfig>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawRuleConfig")]
pub struct RuleConfig {
    pub good_examples: Vec<String>,
    pub bad_examples: Vec<String>,
    pub patterns: Vec<String>,
    pub per_category: BTreeMap<Category, CategoryVariant>,
}

/// Category-specific example and pattern lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryVariant {
    pub good_examples: Vec<String>,
    pub bad_examples: Vec<String>,
    pub patterns: Vec<String>,
}

impl RuleConfig {
    /// True when patterns are grouped per category.
    pub fn is_multi_category(&self) -> bool {
        self.per_category
            .values()
            .any(|variant| !variant.patterns.is_empty())
    }

    /// Categories with a non-empty pattern group, in canonical order.
    pub fn category_patterns(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.per_category
            .iter()
            .filter(|(_, variant)| !variant.patterns.is_empty())
            .map(|(category, variant)| (*category, variant.patterns.as_slice()))
    }

    /// Base patterns followed by every per-category group.
    pub fn all_patterns(&self) -> impl Iterator<Item = &String> {
        self.patterns
            .iter()
            .chain(self.per_category.values().flat_map(|variant| &variant.patterns))
    }

    /// No examples and no patterns anywhere.
    pub fn is_empty(&self) -> bool {
        self.good_examples.is_empty()
            && self.bad_examples.is_empty()
            && self.patterns.is_empty()
            && self.per_category.values().all(|variant| {
                variant.good_examples.is_empty()
                    && variant.bad_examples.is_empty()
                    && variant.patterns.is_empty()
            })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRuleConfig {
    good_examples: Vec<String>,
    bad_examples: Vec<String>,
    patterns: Vec<String>,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl From<RawRuleConfig> for RuleConfig {
    fn from(raw: RawRuleConfig) -> Self {
        let mut per_category: BTreeMap<Category, CategoryVariant> = BTreeMap::new();
        for (key, value) in raw.rest {
            let Some((list, category)) = split_variant_key(&key) else {
                continue;
            };
            let Value::Array(items) = value else {
                continue;
            };
            let values = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    _ => None,
                });
            let variant = per_category.entry(category).or_default();
            match list {
                VariantList::Good => variant.good_examples.extend(values),
                VariantList::Bad => variant.bad_examples.extend(values),
                VariantList::Patterns => variant.patterns.extend(values),
            }
        }

        Self {
            good_examples: raw.good_examples,
            bad_examples: raw.bad_examples,
            patterns: raw.patterns,
            per_category,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum VariantList {
    Good,
    Bad,
    Patterns,
}

fn split_variant_key(key: &str) -> Option<(VariantList, Category)> {
    let (base, suffix) = key.rsplit_once('_')?;
    let list = match base {
        "good_examples" => VariantList::Good,
        "bad_examples" => VariantList::Bad,
        "patterns" => VariantList::Patterns,
        _ => return None,
    };
    // Keys are matched exactly; `patterns_Process` is not a variant.
    let category = Category::ALL
        .into_iter()
        .find(|category| category.as_str() == suffix)?;
    Some((list, category))
}
