//! Candidate generation.
//!
//! The refinement loop only sees the [`Generator`] trait. [`CommandGenerator`]
//! is the bundled implementation: it pipes a rendered prompt into a configured
//! command and reads the definition from its stdout.

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::core::types::{CandidateContext, Category};
use crate::error::RefineError;
use crate::io::config::GeneratorConfig;
use crate::io::process::{ProcessLimits, run_with_input};
use crate::io::prompt::PromptEngine;

/// Everything a generator needs for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub term: &'a str,
    pub context: &'a CandidateContext,
    /// Feedback accumulated over previous attempts, oldest first.
    pub feedback: &'a [String],
    /// 1-based attempt number.
    pub iteration: u32,
    pub category: Category,
}

/// Produces candidate definition text.
///
/// An `Err` is terminal for the run; retrying is up to the implementation.
pub trait Generator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String>;
}

/// Generator backed by an external command.
#[derive(Debug)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
    prompts: PromptEngine,
}

impl CommandGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("generator.command must be a non-empty array"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: Duration::from_secs(config.timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
            prompts: PromptEngine::new()?,
        })
    }
}

impl Generator for CommandGenerator {
    #[instrument(skip_all, fields(term = request.term, iteration = request.iteration))]
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let prompt = self.prompts.render_generator(request)?;
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        let limits = ProcessLimits {
            timeout: self.timeout,
            output_limit_bytes: self.output_limit_bytes,
        };
        let output = run_with_input(cmd, prompt.as_bytes(), limits)
            .map_err(|err| RefineError::Generation(format!("{err:#}")))?;

        if output.timed_out {
            return Err(RefineError::Generation(format!(
                "generator command timed out after {}s",
                self.timeout.as_secs()
            ))
            .into());
        }
        if !output.status.success() {
            return Err(RefineError::Generation(format!(
                "generator command exited with {}: {}",
                output.status,
                output.stderr.text().trim()
            ))
            .into());
        }

        let text = output.stdout.text().trim().to_string();
        if text.is_empty() {
            return Err(RefineError::Generation("generator command produced no output".to_string()).into());
        }
        debug!(bytes = text.len(), "generated candidate");
        Ok(text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn config(script: &str) -> GeneratorConfig {
        GeneratorConfig {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            timeout_secs: 10,
            ..GeneratorConfig::default()
        }
    }

    fn generate(generator: &CommandGenerator) -> Result<String> {
        let context = CandidateContext::default();
        generator.generate(&GenerationRequest {
            term: "permit",
            context: &context,
            feedback: &[],
            iteration: 1,
            category: Category::Result,
        })
    }

    #[test]
    fn reads_definition_from_stdout() {
        let generator = CommandGenerator::new(&config(
            "cat > /dev/null; echo 'document issued following an assessment'",
        ))
        .expect("generator");
        assert_eq!(
            generate(&generator).expect("generate"),
            "document issued following an assessment"
        );
    }

    #[test]
    fn prompt_is_written_to_stdin() {
        let generator = CommandGenerator::new(&config("grep -o '<term>permit</term>'"))
            .expect("generator");
        assert_eq!(generate(&generator).expect("generate"), "<term>permit</term>");
    }

    #[test]
    fn failures_are_generation_errors() {
        let failing = CommandGenerator::new(&config("echo broken >&2; exit 3")).expect("generator");
        let err = generate(&failing).expect_err("non-zero exit");
        assert!(matches!(
            err.downcast_ref::<RefineError>(),
            Some(RefineError::Generation(_))
        ));
        assert!(err.to_string().contains("broken"));

        let silent = CommandGenerator::new(&config("cat > /dev/null")).expect("generator");
        let err = generate(&silent).expect_err("empty output");
        assert!(err.to_string().contains("produced no output"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let config = GeneratorConfig {
            command: Vec::new(),
            ..GeneratorConfig::default()
        };
        assert!(CommandGenerator::new(&config).is_err());
    }
}
