//! Test-only collaborators: scripted generators, lookups and rules.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};

use crate::core::types::{Candidate, RuleId, Severity, ValidationOutcome, ViolationType};
use crate::io::generator::{GenerationRequest, Generator};
use crate::io::lookup::{
    CitationSpan, DefinitionCandidate, DefinitionLookup, ReferenceDescriptor, ReferenceLookup,
    SourceRecognizer,
};
use crate::rules::{ContentRule, Rule, RuleConfig, RuleConfigs, RuleMeta, RuleRegistry};

/// Generator that replays a fixed script, one entry per call.
///
/// `Err` entries become generation errors. Running past the end of the script
/// is an error as well.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: RefCell<VecDeque<std::result::Result<String, String>>>,
    feedback_seen: RefCell<Vec<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<std::result::Result<&str, &str>>) -> Self {
        let script = script
            .into_iter()
            .map(|entry| entry.map(str::to_string).map_err(str::to_string))
            .collect();
        Self {
            script: RefCell::new(script),
            feedback_seen: RefCell::new(Vec::new()),
        }
    }

    /// Generator returning each text in turn.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|text| Ok(*text)).collect())
    }

    /// Feedback passed to each call, in call order.
    pub fn feedback_seen(&self) -> Vec<Vec<String>> {
        self.feedback_seen.borrow().clone()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        self.feedback_seen.borrow_mut().push(request.feedback.to_vec());
        match self.script.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => bail!("generator script exhausted"),
        }
    }
}

/// Thread-safe generator returning a fixed text per term.
#[derive(Debug, Clone, Default)]
pub struct FixedGenerator {
    texts: HashMap<String, String>,
    delay: Option<Duration>,
}

impl FixedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, term: &str, text: &str) -> Self {
        self.texts.insert(term.to_string(), text.to_string());
        self
    }

    /// Sleep before answering, to exercise time budgets.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Generator for FixedGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.texts
            .get(request.term)
            .cloned()
            .ok_or_else(|| anyhow!("no text scripted for term '{}'", request.term))
    }
}

/// Lookup returning canned definitions and references.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLookup {
    definitions: Vec<DefinitionCandidate>,
    references: Vec<ReferenceDescriptor>,
}

impl ScriptedLookup {
    pub fn with_definitions(texts: &[&str]) -> Self {
        Self {
            definitions: texts
                .iter()
                .map(|text| DefinitionCandidate {
                    text: text.to_string(),
                    source: "scripted".to_string(),
                    reliability_score: 0.9,
                })
                .collect(),
            references: Vec::new(),
        }
    }

    pub fn with_references(mut self, references: Vec<ReferenceDescriptor>) -> Self {
        self.references = references;
        self
    }
}

impl DefinitionLookup for ScriptedLookup {
    fn search(&self, _term: &str, _domain_hint: Option<&str>) -> Result<Vec<DefinitionCandidate>> {
        Ok(self.definitions.clone())
    }
}

impl ReferenceLookup for ScriptedLookup {
    fn search_references(&self, _text: &str) -> Result<Vec<ReferenceDescriptor>> {
        Ok(self.references.clone())
    }
}

/// Lookup whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingLookup;

impl DefinitionLookup for FailingLookup {
    fn search(&self, _term: &str, _domain_hint: Option<&str>) -> Result<Vec<DefinitionCandidate>> {
        bail!("definition service unavailable")
    }
}

impl ReferenceLookup for FailingLookup {
    fn search_references(&self, _text: &str) -> Result<Vec<ReferenceDescriptor>> {
        bail!("reference service unavailable")
    }
}

impl SourceRecognizer for FailingLookup {
    fn recognize(&self, _text: &str) -> Result<Vec<CitationSpan>> {
        bail!("source recognizer unavailable")
    }
}

/// Rule whose validation always errors.
#[derive(Debug, Clone)]
pub struct FailingRule {
    meta: RuleMeta,
    message: String,
}

impl FailingRule {
    pub fn new(id: &str, message: &str) -> Self {
        Self {
            meta: RuleMeta::new(id, "broken rule", Severity::High, ViolationType::ContentIssue),
            message: message.to_string(),
        }
    }
}

impl Rule for FailingRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn validate(&self, _candidate: &Candidate, _config: &RuleConfig) -> Result<ValidationOutcome> {
        bail!("{}", self.message)
    }
}

/// Registry of high-severity content rules, each forbidding one word.
///
/// A candidate containing `k` of `n` forbidden words scores `(n - k) / n`.
pub fn word_rules(rules: &[(&str, &str)]) -> (RuleRegistry, RuleConfigs) {
    let mut registry = RuleRegistry::new();
    let mut configs = RuleConfigs::new();
    for (id, word) in rules {
        registry.register(ContentRule::new(RuleMeta::new(
            *id,
            format!("no '{word}'"),
            Severity::High,
            ViolationType::ContentIssue,
        )));
        configs.insert(
            RuleId::from(*id),
            RuleConfig {
                patterns: vec![format!(r"\b{word}\b")],
                ..RuleConfig::default()
            },
        );
    }
    (registry, configs)
}

/// Write a rule configuration into a fresh temp directory.
///
/// The directory is removed when the returned guard is dropped.
pub fn temp_rule_file(json: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rules.json");
    fs::write(&path, json)?;
    Ok((dir, path))
}
