//! Typed errors surfaced at component boundaries.
//!
//! Most call sites propagate `anyhow::Error`; these variants exist so callers
//! can tell configuration problems apart from rule or collaborator failures.

use thiserror::Error;

use crate::core::types::RuleId;

#[derive(Debug, Error)]
pub enum RefineError {
    /// A configured pattern does not compile. The pattern is skipped.
    #[error("rule {rule_id}: invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        rule_id: RuleId,
        pattern: String,
        message: String,
    },

    /// Rule configuration could not be loaded or does not match its schema.
    #[error("rule configuration: {0}")]
    Configuration(String),

    /// A validator failed while evaluating a candidate.
    #[error("rule {rule_id} failed during execution: {message}")]
    RuleExecution { rule_id: RuleId, message: String },

    /// The generator could not produce a candidate.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A lookup collaborator failed; classification continues without it.
    #[error("{collaborator} lookup failed: {message}")]
    Lookup {
        collaborator: &'static str,
        message: String,
    },
}
