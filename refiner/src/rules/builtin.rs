//! The bundled rule set.
//!
//! Rule metadata lives here; examples and patterns ship separately in
//! `rules/default_rules.json` so they can be tuned without a rebuild.

use crate::core::types::{Category, Severity, ViolationType};
use crate::rules::{
    ContentCheck, ContentRule, EssentialRule, RuleMeta, RuleRegistry, StructuralCheck,
    StructuralRule,
};

pub fn default_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();

    registry.register(
        ContentRule::new(
            RuleMeta::new(
                "CON-01",
                "implicit context",
                Severity::Critical,
                ViolationType::ContentIssue,
            )
            .with_hint("refer to 'the competent authority' instead of naming the organisation"),
        )
        .with_check(ContentCheck::ContextReference),
    );
    registry.register(EssentialRule::new(
        RuleMeta::new(
            "CON-02",
            "authoritative source",
            Severity::Medium,
            ViolationType::MissingElement,
        )
        .with_hint("cite the article or section the definition is based on"),
    ));
    registry.register(ContentRule::new(
        RuleMeta::new(
            "ESS-01",
            "essence, not purpose",
            Severity::High,
            ViolationType::ForbiddenPattern,
        )
        .with_hint("state what the term is; move purpose clauses elsewhere"),
    ));
    registry.register(EssentialRule::new(RuleMeta::new(
        "ESS-02",
        "ontological category marker",
        Severity::High,
        ViolationType::MissingElement,
    )));
    registry.register(StructuralRule::new(
        RuleMeta::new(
            "STR-01",
            "genus-first opening",
            Severity::Medium,
            ViolationType::ForbiddenPattern,
        )
        .with_hint("open with the genus noun"),
    ));
    registry.register(
        StructuralRule::new(RuleMeta::new(
            "STR-02",
            "single sentence",
            Severity::Medium,
            ViolationType::StructureIssue,
        ))
        .with_check(StructuralCheck::SingleSentence),
    );
    registry.register(
        StructuralRule::new(RuleMeta::new(
            "INT-01",
            "no circular definition",
            Severity::High,
            ViolationType::ClarityIssue,
        ))
        .with_check(StructuralCheck::NoTermRepetition),
    );

    let category_rules = [
        ("PRO-01", "description of the activity", Category::Process),
        ("RES-01", "originating process", Category::Result),
        ("TYP-01", "distinguishing characteristics", Category::Type),
        ("INS-01", "identifying feature", Category::Instance),
    ];
    for (id, name, category) in category_rules {
        registry.register(EssentialRule::new(
            RuleMeta::new(id, name, Severity::Medium, ViolationType::MissingElement)
                .for_categories(&[category]),
        ));
    }

    registry
}
