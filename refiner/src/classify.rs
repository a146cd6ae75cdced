//! Full ontological classification.
//!
//! Six ordered stages:
//!
//! 1. Exploration: definitions from the definition lookup, scanned for cues.
//! 2. Context: domain references and citations in those definitions.
//! 3. Category test: one weighted score per category; arg-max wins.
//! 4. Identity and persistence criteria for the chosen category.
//! 5. Role analysis: role nouns versus intrinsic kinds.
//! 6. Documentation: a category template plus a reasoning narrative.
//!
//! Lookup failures empty their stage. Anything that stops the pipeline itself
//! (blank term, template failure) falls back to [`classify_quick`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use minijinja::{Environment, context};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::classifier::{
    INSTANCE_WORDS, PROCESS_SUFFIXES, PROCESS_WORDS, RESULT_SUFFIXES, RESULT_WORDS, TYPE_WORDS,
    classify_quick, contained_word, head_word, matching_suffix,
};
use crate::core::types::Category;
use crate::error::RefineError;
use crate::io::lookup::{DefinitionCandidate, DefinitionLookup, ReferenceLookup, SourceRecognizer};

const TYPE_TEMPLATE: &str = include_str!("templates/type.md");
const PROCESS_TEMPLATE: &str = include_str!("templates/process.md");
const RESULT_TEMPLATE: &str = include_str!("templates/result.md");
const INSTANCE_TEMPLATE: &str = include_str!("templates/instance.md");

/// Order in which equal scores are resolved.
const PRECEDENCE: [Category; 4] = [
    Category::Process,
    Category::Type,
    Category::Result,
    Category::Instance,
];

/// Other categories scoring above this are reported as secondary aspects.
const SECONDARY_THRESHOLD: f64 = 0.3;

const CUE_WEIGHT: f64 = 0.15;
const CUE_CAP: f64 = 0.45;

const PROCESS_CUES: &[&str] = &["activity", "procedure", "action", "carried out", "performed", "steps"];
const TYPE_CUES: &[&str] = &["kind of", "type of", "class of", "category of", "in general"];
const RESULT_CUES: &[&str] = &["outcome", "result of", "produced", "issued", "document"];
const INSTANCE_CUES: &[&str] = &["specific", "particular", "identified by", "named", "unique"];

const ROLE_SUFFIXES: &[&str] = &["er", "or", "ant", "ent", "ee", "ist"];
const ROLE_MIN_STEM: usize = 3;
/// Bearer assumed for a role noun when no definition names one.
const DEFAULT_BEARER: &str = "person or organisation";

/// "a person who applies for a permit": bearer, then what it does.
static ROLE_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:an?|the)\s+([a-z]+)\s+(?:who|that|which)\s+([a-z]+(?:\s+[a-z0-9]+){0,5})")
        .expect("role clause regex")
});

/// "a company acting as agent for the owner": bearer, marker, role.
static ROLE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:an?\s+|the\s+)?([a-z]+)\s+(acting as|in the role of|in the capacity of|on behalf of)\s+([a-z][a-z0-9 ]*[a-z0-9])",
    )
    .expect("role marker regex")
});

static SYNONYM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:also (?:called|known as)|synonym:)\s+([\w][\w -]*\w)")
        .expect("synonym regex")
});

/// Role versus intrinsic reading of a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleAnalysis {
    /// The term names what something is.
    Intrinsic,
    /// The term names a role some base entity plays.
    Role {
        base_entity: String,
        /// What the bearer does in this role.
        role: String,
        cue: String,
    },
}

/// Outcome of the full classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub term: String,
    pub category: Category,
    pub scores: BTreeMap<Category, f64>,
    pub secondary: Vec<Category>,
    pub features: Vec<String>,
    pub synonyms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub references: Vec<String>,
    pub citations: Vec<String>,
    pub identity_criteria: Vec<String>,
    pub persistence_criteria: Vec<String>,
    pub role: RoleAnalysis,
    pub definition_template: String,
    pub reasoning: String,
    /// True when the pipeline failed and the quick classifier answered.
    pub fallback: bool,
}

impl Classification {
    fn fallback(term: &str, err: &anyhow::Error) -> Self {
        let quick = classify_quick(term);
        Self {
            term: term.trim().to_string(),
            category: quick.category,
            scores: BTreeMap::new(),
            secondary: Vec::new(),
            features: Vec::new(),
            synonyms: Vec::new(),
            domain: None,
            references: Vec::new(),
            citations: Vec::new(),
            identity_criteria: Vec::new(),
            persistence_criteria: Vec::new(),
            role: RoleAnalysis::Intrinsic,
            definition_template: String::new(),
            reasoning: format!(
                "fallback to quick classification: {err:#}; {}",
                quick.justification
            ),
            fallback: true,
        }
    }
}

/// Six-stage classifier over pluggable lookups.
pub struct OntologyClassifier<'a> {
    definitions: &'a dyn DefinitionLookup,
    references: &'a dyn ReferenceLookup,
    sources: &'a dyn SourceRecognizer,
}

struct Exploration {
    definitions: Vec<DefinitionCandidate>,
    features: Vec<String>,
    synonyms: Vec<String>,
}

struct DomainContext {
    domain: Option<String>,
    references: Vec<String>,
    citations: Vec<String>,
}

impl<'a> OntologyClassifier<'a> {
    pub fn new(
        definitions: &'a dyn DefinitionLookup,
        references: &'a dyn ReferenceLookup,
        sources: &'a dyn SourceRecognizer,
    ) -> Self {
        Self {
            definitions,
            references,
            sources,
        }
    }

    /// Classify `term`. Never fails; see [`Classification::fallback`].
    #[instrument(skip_all, fields(term = term))]
    pub fn classify(&self, term: &str, domain_hint: Option<&str>) -> Classification {
        match self.try_classify(term, domain_hint) {
            Ok(classification) => classification,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "full classification failed");
                Classification::fallback(term, &err)
            }
        }
    }

    fn try_classify(&self, term: &str, domain_hint: Option<&str>) -> Result<Classification> {
        let term = term.trim();
        if term.is_empty() {
            bail!("term is empty");
        }

        let exploration = self.explore(term, domain_hint);
        let corpus = exploration
            .definitions
            .iter()
            .map(|candidate| candidate.text.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");
        let domain_context = self.analyse_context(&corpus, domain_hint);

        let scores = category_scores(term, &corpus);
        let category = primary_category(&scores);
        let secondary: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|other| *other != category && scores[other] > SECONDARY_THRESHOLD)
            .collect();
        debug!(%category, ?secondary, "category test complete");

        let (identity_criteria, persistence_criteria) = criteria(category);
        let role = analyse_role(term, category, &corpus);
        let definition_template =
            render_template(term, category, &secondary, &role, domain_context.domain.as_deref())?;
        let reasoning = narrative(
            category,
            &scores,
            &exploration.features,
            domain_context.domain.as_deref(),
            &secondary,
            &role,
        );

        Ok(Classification {
            term: term.to_string(),
            category,
            scores,
            secondary,
            features: exploration.features,
            synonyms: exploration.synonyms,
            domain: domain_context.domain,
            references: domain_context.references,
            citations: domain_context.citations,
            identity_criteria,
            persistence_criteria,
            role,
            definition_template,
            reasoning,
            fallback: false,
        })
    }

    fn explore(&self, term: &str, domain_hint: Option<&str>) -> Exploration {
        let definitions = match self.definitions.search(term, domain_hint) {
            Ok(definitions) => definitions,
            Err(err) => {
                let err = RefineError::Lookup {
                    collaborator: "definition",
                    message: format!("{err:#}"),
                };
                warn!(error = %err, "continuing without definitions");
                Vec::new()
            }
        };

        let mut features = Vec::new();
        let mut synonyms = Vec::new();
        for candidate in &definitions {
            let text = candidate.text.to_lowercase();
            let cue_tables = [
                (Category::Type, TYPE_CUES),
                (Category::Process, PROCESS_CUES),
                (Category::Result, RESULT_CUES),
                (Category::Instance, INSTANCE_CUES),
            ];
            for (category, cues) in cue_tables {
                for cue in cues.iter().filter(|cue| text.contains(*cue)) {
                    push_unique(&mut features, format!("{category}: {cue}"));
                }
            }
            for captures in SYNONYM_RE.captures_iter(&candidate.text) {
                if let Some(synonym) = captures.get(1) {
                    push_unique(&mut synonyms, synonym.as_str().to_lowercase());
                }
            }
        }
        debug!(
            definitions = definitions.len(),
            features = features.len(),
            "exploration complete"
        );
        Exploration {
            definitions,
            features,
            synonyms,
        }
    }

    fn analyse_context(&self, corpus: &str, domain_hint: Option<&str>) -> DomainContext {
        let descriptors = self.references.search_references(corpus).unwrap_or_else(|err| {
            let err = RefineError::Lookup {
                collaborator: "reference",
                message: format!("{err:#}"),
            };
            warn!(error = %err, "continuing without references");
            Vec::new()
        });
        let citations = self.sources.recognize(corpus).unwrap_or_else(|err| {
            let err = RefineError::Lookup {
                collaborator: "source",
                message: format!("{err:#}"),
            };
            warn!(error = %err, "continuing without citations");
            Vec::new()
        });

        let domain = descriptors
            .iter()
            .find_map(|descriptor| descriptor.domain.clone())
            .or_else(|| domain_hint.map(str::to_string));
        DomainContext {
            domain,
            references: descriptors.into_iter().map(|descriptor| descriptor.label).collect(),
            citations: citations.into_iter().map(|span| span.text).collect(),
        }
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn semantic_score(corpus: &str, cues: &[&str]) -> f64 {
    let hits = cues.iter().filter(|cue| corpus.contains(*cue)).count();
    (hits as f64 * CUE_WEIGHT).min(CUE_CAP)
}

fn is_proper_noun(term: &str) -> bool {
    let mut chars = term.chars();
    chars.next().is_some_and(char::is_uppercase) && chars.any(char::is_lowercase)
}

/// Weighted lexical and semantic cues per category, clamped to `[0, 1]`.
pub fn category_scores(term: &str, corpus: &str) -> BTreeMap<Category, f64> {
    let normalized = term.trim().to_lowercase();
    let lexical = |hit: bool, weight: f64| if hit { weight } else { 0.0 };

    let process = lexical(matching_suffix(&normalized, PROCESS_SUFFIXES).is_some(), 0.5)
        + lexical(contained_word(&normalized, PROCESS_WORDS).is_some(), 0.4)
        + semantic_score(corpus, PROCESS_CUES);
    let kind = lexical(contained_word(&normalized, TYPE_WORDS).is_some(), 0.5)
        + semantic_score(corpus, TYPE_CUES);
    let result = lexical(matching_suffix(&normalized, RESULT_SUFFIXES).is_some(), 0.4)
        + lexical(contained_word(&normalized, RESULT_WORDS).is_some(), 0.4)
        + semantic_score(corpus, RESULT_CUES);
    let instance = lexical(contained_word(&normalized, INSTANCE_WORDS).is_some(), 0.5)
        + lexical(is_proper_noun(term.trim()), 0.3)
        + semantic_score(corpus, INSTANCE_CUES);

    [
        (Category::Type, kind),
        (Category::Process, process),
        (Category::Result, result),
        (Category::Instance, instance),
    ]
    .into_iter()
    .map(|(category, score)| (category, score.clamp(0.0, 1.0)))
    .collect()
}

/// Highest score wins; ties follow quick-classifier precedence; all zero is a type.
pub fn primary_category(scores: &BTreeMap<Category, f64>) -> Category {
    let mut best = Category::Type;
    let mut best_score = 0.0;
    for category in PRECEDENCE {
        let score = scores.get(&category).copied().unwrap_or(0.0);
        if score > best_score {
            best = category;
            best_score = score;
        }
    }
    best
}

fn criteria(category: Category) -> (Vec<String>, Vec<String>) {
    let (identity, persistence): (&[&str], &[&str]) = match category {
        Category::Type => (
            &[
                "members share the defining characteristics",
                "distinguished from sibling kinds by at least one characteristic",
            ],
            &["exists as long as the classification is in use"],
        ),
        Category::Process => (
            &[
                "identified by its actors, steps and object",
                "has a recognisable trigger and end state",
            ],
            &["occurs in time and is finished once the end state is reached"],
        ),
        Category::Result => (
            &["identified by the process that produced it"],
            &["persists after the producing process has ended"],
        ),
        Category::Instance => (
            &["identified by a unique designation"],
            &["remains the same individual through changes of its properties"],
        ),
    };
    (
        identity.iter().map(|value| value.to_string()).collect(),
        persistence.iter().map(|value| value.to_string()).collect(),
    )
}

fn analyse_role(term: &str, category: Category, corpus: &str) -> RoleAnalysis {
    if !matches!(category, Category::Type | Category::Instance) {
        return RoleAnalysis::Intrinsic;
    }
    let normalized = term.to_lowercase();
    let word = head_word(&normalized);
    let suffix = ROLE_SUFFIXES.iter().find(|suffix| {
        word.len() >= suffix.len() + ROLE_MIN_STEM && word.ends_with(*suffix) && !word.ends_with("ment")
    });
    if let Some(suffix) = suffix {
        let (base_entity, role) = match ROLE_CLAUSE_RE.captures(corpus) {
            Some(captures) => (captures[1].to_string(), captures[2].to_string()),
            None => (DEFAULT_BEARER.to_string(), format!("acts as {}", normalized.trim())),
        };
        return RoleAnalysis::Role {
            base_entity,
            role,
            cue: format!("suffix '-{suffix}'"),
        };
    }
    if let Some(captures) = ROLE_MARKER_RE.captures(corpus) {
        return RoleAnalysis::Role {
            base_entity: captures[1].to_string(),
            role: format!("{} {}", &captures[2], &captures[3]),
            cue: format!("marker '{}'", &captures[2]),
        };
    }
    RoleAnalysis::Intrinsic
}

fn render_template(
    term: &str,
    category: Category,
    secondary: &[Category],
    role: &RoleAnalysis,
    domain: Option<&str>,
) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("type", TYPE_TEMPLATE)?;
    env.add_template("process", PROCESS_TEMPLATE)?;
    env.add_template("result", RESULT_TEMPLATE)?;
    env.add_template("instance", INSTANCE_TEMPLATE)?;

    let role = match role {
        RoleAnalysis::Role { .. } => Some(role),
        RoleAnalysis::Intrinsic => None,
    };
    let secondary: Vec<&str> = secondary.iter().map(|category| category.as_str()).collect();
    let rendered = env
        .get_template(category.as_str())?
        .render(context! {
            term => term,
            secondary => secondary,
            role => role,
            domain => domain,
        })
        .with_context(|| format!("render {category} template"))?;
    Ok(rendered.trim().to_string())
}

fn narrative(
    category: Category,
    scores: &BTreeMap<Category, f64>,
    features: &[String],
    domain: Option<&str>,
    secondary: &[Category],
    role: &RoleAnalysis,
) -> String {
    let scores = scores
        .iter()
        .map(|(category, score)| format!("{category} {score:.2}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut parts = vec![format!("classified as {category} (test scores: {scores})")];
    if !features.is_empty() {
        parts.push(format!("detected features: {}", features.join(", ")));
    }
    if let Some(domain) = domain {
        parts.push(format!("domain: {domain}"));
    }
    if !secondary.is_empty() {
        let names: Vec<&str> = secondary.iter().map(|category| category.as_str()).collect();
        parts.push(format!("secondary aspects: {}", names.join(", ")));
    }
    if let RoleAnalysis::Role {
        base_entity,
        role,
        cue,
    } = role
    {
        parts.push(format!("role '{role}' of a {base_entity} ({cue})"));
    }
    parts.join("; ")
}
