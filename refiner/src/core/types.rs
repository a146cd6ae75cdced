//! Shared deterministic types for rule evaluation and refinement runs.
//!
//! These types define stable contracts between the rule registry, the
//! orchestrator, the feedback synthesizer, and the refinement loop. They carry
//! no I/O and serialize to a stable JSON shape.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ontological category of the thing a term denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Type,
    Process,
    Result,
    Instance,
}

impl Category {
    /// All categories in their canonical order.
    pub const ALL: [Category; 4] = [
        Category::Type,
        Category::Process,
        Category::Result,
        Category::Instance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Type => "type",
            Category::Process => "process",
            Category::Result => "result",
            Category::Instance => "instance",
        }
    }

    /// Three-letter code used as the rule-id prefix of category-specific rules.
    pub fn code(self) -> &'static str {
        match self {
            Category::Type => "TYP",
            Category::Process => "PRO",
            Category::Result => "RES",
            Category::Instance => "INS",
        }
    }

    /// Parse a category name from the fixed vocabulary (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strongly-typed rule identifier (e.g. `CON-01`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the id starts with the given three-letter category code.
    pub fn has_prefix(&self, code: &str) -> bool {
        self.0
            .get(..code.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Organizational, legal and statutory references the definition is written for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateContext {
    pub organizational: Vec<String>,
    pub legal: Vec<String>,
    pub statutory: Vec<String>,
    /// Authoritative category supplied by the caller. Validated against
    /// [`Category::parse`] by multi-category rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_override: Option<String>,
}

impl CandidateContext {
    /// All non-empty context references in a stable order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.organizational
            .iter()
            .chain(&self.legal)
            .chain(&self.statutory)
            .map(|reference| reference.trim())
            .filter(|reference| !reference.is_empty())
    }
}

/// One generated definition of a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub term: String,
    pub text: String,
    pub context: CandidateContext,
}

impl Candidate {
    pub fn new(term: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            text: text.into(),
            context: CandidateContext::default(),
        }
    }

    pub fn with_context(mut self, context: CandidateContext) -> Self {
        self.context = context;
        self
    }
}

/// Result of evaluating one rule against one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutcomeStatus {
    Pass,
    Fail,
    Warning,
    Info,
    Skipped,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Pass => "PASS",
            OutcomeStatus::Fail => "FAIL",
            OutcomeStatus::Warning => "WARNING",
            OutcomeStatus::Info => "INFO",
            OutcomeStatus::Skipped => "SKIPPED",
        }
    }
}

/// Structured outcome of a single (candidate, rule) evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub rule_id: RuleId,
    pub status: OutcomeStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Example or matched text that decided the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected: Option<String>,
    /// Categories named by the outcome (multi-category rules).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

impl ValidationOutcome {
    pub fn new(rule_id: RuleId, status: OutcomeStatus, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            status,
            message: message.into(),
            detail: None,
            detected: None,
            categories: Vec::new(),
        }
    }

    pub fn pass(rule_id: RuleId, message: impl Into<String>) -> Self {
        Self::new(rule_id, OutcomeStatus::Pass, message)
    }

    pub fn fail(rule_id: RuleId, message: impl Into<String>) -> Self {
        Self::new(rule_id, OutcomeStatus::Fail, message)
    }

    pub fn warning(rule_id: RuleId, message: impl Into<String>) -> Self {
        Self::new(rule_id, OutcomeStatus::Warning, message)
    }

    pub fn info(rule_id: RuleId, message: impl Into<String>) -> Self {
        Self::new(rule_id, OutcomeStatus::Info, message)
    }

    pub fn skipped(rule_id: RuleId, message: impl Into<String>) -> Self {
        Self::new(rule_id, OutcomeStatus::Skipped, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_detected(mut self, detected: impl Into<String>) -> Self {
        self.detected = Some(detected.into());
        self
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    pub fn is_fail(&self) -> bool {
        self.status == OutcomeStatus::Fail
    }
}

/// One-way human-readable projection, e.g. `[FAIL] CON-01: explicit context reference 'X' found`.
impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status.as_str(), self.rule_id, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Kind of rule failure, used to group feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationType {
    ForbiddenPattern,
    MissingElement,
    StructureIssue,
    ContentIssue,
    ClarityIssue,
}

/// Structured record of one rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Aggregated judgement of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub overall_score: f64,
    pub rule_scores: BTreeMap<RuleId, f64>,
    pub passed: Vec<RuleId>,
    pub failed: Vec<RuleId>,
    pub warnings: Vec<RuleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub category_compliance: f64,
    pub acceptable: bool,
    pub suggestions: Vec<String>,
    pub outcomes: Vec<ValidationOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    Accepted,
    Rejected,
}

/// Record of one generate → validate → feedback cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// Iteration number (1-indexed, strictly increasing within a run).
    pub iteration: u32,
    pub candidate_text: String,
    pub verdict: Verdict,
    pub feedback: Vec<String>,
    pub duration: Duration,
    pub status: IterationStatus,
}

/// Refinement loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    Initializing,
    Generating,
    Validating,
    Improving,
    Completed,
    Failed,
}

/// Final outcome of a refinement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub term: String,
    pub category: Category,
    pub final_text: String,
    pub iterations: Vec<IterationResult>,
    pub total_time: Duration,
    pub success: bool,
    pub reason: String,
    /// Iteration number of the highest-scoring iteration (earliest on ties).
    pub best_iteration: Option<u32>,
    pub score_history: Vec<f64>,
    pub state: AgentState,
    /// Set when the last scored iteration gained less than the minimum
    /// improvement. Informational; never replaces `reason`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl AgentResult {
    pub fn best(&self) -> Option<&IterationResult> {
        let number = self.best_iteration?;
        self.iterations
            .iter()
            .find(|iteration| iteration.iteration == number)
    }
}
