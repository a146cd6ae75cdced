//! Rule configuration loading with JSON Schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::Draft;
use serde_json::Value;
use tracing::debug;

use crate::error::RefineError;
use crate::rules::RuleConfigs;

const RULE_CONFIG_SCHEMA: &str = include_str!("../../schemas/rule_config.schema.json");
const DEFAULT_RULES: &str = include_str!("../../rules/default_rules.json");

/// Load and validate rule configurations from a JSON file.
pub fn load_rule_configs(path: &Path) -> Result<RuleConfigs> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read rule config {}", path.display()))?;
    parse_rule_configs(&contents).with_context(|| format!("load rule config {}", path.display()))
}

/// Validate `raw` against the bundled schema and parse it.
pub fn parse_rule_configs(raw: &str) -> Result<RuleConfigs> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| RefineError::Configuration(format!("parse json: {err}")))?;
    validate_schema(&value)?;
    let configs: RuleConfigs = serde_json::from_value(value)
        .map_err(|err| RefineError::Configuration(format!("deserialize: {err}")))?;
    debug!(rules = configs.len(), "loaded rule configurations");
    Ok(configs)
}

/// The configuration bundled with the default rule set.
pub fn default_rule_configs() -> Result<RuleConfigs> {
    parse_rule_configs(DEFAULT_RULES).context("bundled default rules")
}

/// Load `path` if given, otherwise the bundled defaults.
pub fn rule_configs_or_default(path: Option<&Path>) -> Result<RuleConfigs> {
    match path {
        Some(path) => load_rule_configs(path),
        None => default_rule_configs(),
    }
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(RULE_CONFIG_SCHEMA).context("parse rule config schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| anyhow!("invalid rule config schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(RefineError::Configuration(format!(
            "schema validation failed: {}",
            messages.join("; ")
        ))
        .into());
    }
    Ok(())
}
