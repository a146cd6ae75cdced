//! Prompt rendering for the command-backed generator.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::io::generator::GenerationRequest;

const GENERATOR_TEMPLATE: &str = include_str!("prompts/generator.md");

/// Template engine wrapper around minijinja.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("generator", GENERATOR_TEMPLATE)
            .context("parse generator template")?;
        Ok(Self { env })
    }

    pub fn render_generator(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let references: Vec<&str> = request.context.references().collect();
        let template = self.env.get_template("generator")?;
        let rendered = template
            .render(context! {
                term => request.term.trim(),
                category => request.category.as_str(),
                references => references,
                feedback => request.feedback,
                iteration => request.iteration,
            })
            .context("render generator prompt")?;
        Ok(collapse_blank_lines(&rendered))
    }
}

/// Collapse runs of blank lines left behind by skipped template blocks.
fn collapse_blank_lines(rendered: &str) -> String {
    let mut out = String::with_capacity(rendered.len());
    let mut blank_run = 0;
    for line in rendered.trim().lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CandidateContext, Category};

    fn request<'a>(
        context: &'a CandidateContext,
        feedback: &'a [String],
        iteration: u32,
    ) -> GenerationRequest<'a> {
        GenerationRequest {
            term: " building permit ",
            context,
            feedback,
            iteration,
            category: Category::Result,
        }
    }

    /// Verifies the first attempt carries no feedback section.
    #[test]
    fn first_attempt_has_no_feedback() {
        let context = CandidateContext::default();
        let prompt = PromptEngine::new()
            .expect("engine")
            .render_generator(&request(&context, &[], 1))
            .expect("render");
        assert!(prompt.contains("<term>building permit</term>"));
        assert!(prompt.contains("<category>result</category>"));
        assert!(!prompt.contains("<feedback"));
        assert!(!prompt.contains("<context>"));
        assert!(!prompt.contains("\n\n\n"));
    }

    /// Verifies feedback and context references are listed in order.
    #[test]
    fn feedback_and_context_are_listed() {
        let context = CandidateContext {
            legal: vec!["Building Act".to_string()],
            ..CandidateContext::default()
        };
        let feedback = vec!["first".to_string(), "second".to_string()];
        let prompt = PromptEngine::new()
            .expect("engine")
            .render_generator(&request(&context, &feedback, 2))
            .expect("render");
        assert!(prompt.contains("- Building Act"));
        assert!(prompt.contains("<feedback attempt=\"2\">"));
        let first = prompt.find("- first").expect("first");
        let second = prompt.find("- second").expect("second");
        assert!(first < second);
    }
}
