//! The refinement loop: generate, evaluate, feed back, repeat.
//!
//! One run is strictly sequential. [`RefinementLoop::run_batch`] runs
//! independent terms on scoped threads that share the evaluator.

use std::fmt;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::core::budget::{deadline_after, is_expired};
use crate::core::classifier::classify_quick;
use crate::core::feedback::{FeedbackBuilder, FeedbackHistory};
use crate::core::types::{
    AgentResult, AgentState, Candidate, CandidateContext, Category, IterationResult,
    IterationStatus,
};
use crate::evaluate::Evaluator;
use crate::io::config::{RefinementConfig, RefinerConfig};
use crate::io::generator::{GenerationRequest, Generator};
use crate::rules::{Rule, Validator};

/// Passing elements named in the "retain these elements" note.
const RETAINED_ELEMENTS: usize = 3;

/// Why a run stopped. `Display` yields the result's `reason` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Accepted { iteration: u32 },
    MaxIterations,
    Error(String),
    Timeout,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Accepted { iteration } => write!(f, "accepted in iteration {iteration}"),
            StopReason::MaxIterations => {
                write!(f, "maximum iterations reached without acceptable result")
            }
            StopReason::Error(message) => write!(f, "error: {message}"),
            StopReason::Timeout => write!(f, "timeout"),
        }
    }
}

/// One term to refine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementRequest {
    pub term: String,
    pub context: CandidateContext,
    /// Category to evaluate under. Classified from the term when absent.
    pub category: Option<Category>,
}

impl RefinementRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            context: CandidateContext::default(),
            category: None,
        }
    }

    pub fn with_context(mut self, context: CandidateContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

pub struct RefinementLoop<'a, G, R: Rule = Validator> {
    generator: &'a G,
    evaluator: &'a Evaluator<'a, R>,
    config: RefinementConfig,
    feedback: FeedbackBuilder,
}

impl<'a, G: Generator, R: Rule> RefinementLoop<'a, G, R> {
    pub fn new(generator: &'a G, evaluator: &'a Evaluator<'a, R>, config: &RefinerConfig) -> Self {
        Self {
            generator,
            evaluator,
            config: config.refinement.clone(),
            feedback: FeedbackBuilder::new(config.feedback.clone()),
        }
    }

    /// Refine one term until a candidate is accepted or the run stops.
    ///
    /// `on_iteration` sees every iteration as soon as it is recorded. The run
    /// always yields a well-formed result; generator errors end it early.
    #[instrument(skip_all, fields(term = %request.term))]
    pub fn run<F: FnMut(&IterationResult)>(
        &self,
        request: &RefinementRequest,
        mut on_iteration: F,
    ) -> AgentResult {
        let started = Instant::now();
        let deadline = deadline_after(started, self.config.timeout());
        let mut state = AgentState::Initializing;

        let category = request.category.unwrap_or_else(|| {
            let quick = classify_quick(&request.term);
            debug!(category = %quick.category, justification = %quick.justification, "classified term");
            quick.category
        });

        let mut iterations: Vec<IterationResult> = Vec::new();
        let mut score_history: Vec<f64> = Vec::new();
        let mut accumulated: Vec<String> = Vec::new();
        let mut best: Option<(u32, f64)> = None;
        let mut insufficient: Option<u32> = None;
        let mut stop = StopReason::MaxIterations;

        for iteration in 1..=self.config.max_iterations {
            if is_expired(deadline) {
                warn!(iteration, "time budget exhausted");
                stop = StopReason::Timeout;
                break;
            }

            transition(&mut state, AgentState::Generating);
            let iteration_started = Instant::now();
            let generated = self.generator.generate(&GenerationRequest {
                term: &request.term,
                context: &request.context,
                feedback: &accumulated,
                iteration,
                category,
            });
            let text = match generated {
                Ok(text) => text,
                Err(err) => {
                    warn!(iteration, error = %format!("{err:#}"), "generation failed");
                    stop = StopReason::Error(format!("{err:#}"));
                    break;
                }
            };

            transition(&mut state, AgentState::Validating);
            let candidate = Candidate::new(request.term.clone(), text).with_context(request.context.clone());
            let verdict = self.evaluator.evaluate(&candidate, Some(category));
            let score = verdict.overall_score;

            if let Some(&previous) = score_history.last() {
                let gain = score - previous;
                if gain < self.config.min_improvement {
                    debug!(iteration, gain, "insufficient improvement");
                    insufficient = Some(iteration);
                } else {
                    insufficient = None;
                }
            }
            score_history.push(score);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((iteration, score));
            }

            let accepted = verdict.acceptable;
            let feedback = if accepted {
                Vec::new()
            } else {
                transition(&mut state, AgentState::Improving);
                let violations = self.evaluator.violations(&verdict);
                let mut successful = self.evaluator.successful_elements(&verdict);
                successful.truncate(RETAINED_ELEMENTS);
                let history = FeedbackHistory {
                    scores: &score_history,
                    successful_elements: &successful,
                    category: Some(category),
                };
                self.feedback.build(&violations, &history, iteration)
            };

            accumulated.extend(feedback.iter().cloned());
            let limit = self.config.feedback_context_limit;
            if accumulated.len() > limit {
                accumulated.drain(..accumulated.len() - limit);
            }

            let result = IterationResult {
                iteration,
                candidate_text: candidate.text,
                verdict,
                feedback,
                duration: iteration_started.elapsed(),
                status: if accepted {
                    IterationStatus::Accepted
                } else {
                    IterationStatus::Rejected
                },
            };
            on_iteration(&result);
            iterations.push(result);

            if accepted {
                stop = StopReason::Accepted { iteration };
                break;
            }
        }

        let diagnostic = insufficient.map(insufficient_improvement);
        if let Some(diagnostic) = &diagnostic {
            info!(diagnostic = %diagnostic, "last improvement below threshold");
        }

        let success = matches!(stop, StopReason::Accepted { .. });
        transition(
            &mut state,
            if success {
                AgentState::Completed
            } else {
                AgentState::Failed
            },
        );

        let best_iteration = best.map(|(iteration, _)| iteration);
        let final_text = match stop {
            StopReason::Accepted { iteration } => text_of(&iterations, iteration),
            _ => best_iteration
                .map(|iteration| text_of(&iterations, iteration))
                .unwrap_or_default(),
        };

        let reason = stop.to_string();
        info!(
            success,
            iterations = iterations.len(),
            best_iteration,
            reason = %reason,
            "refinement finished"
        );

        AgentResult {
            term: request.term.clone(),
            category,
            final_text,
            iterations,
            total_time: started.elapsed(),
            success,
            reason,
            best_iteration,
            score_history,
            state,
            diagnostic,
        }
    }

    /// Refine several terms concurrently. Results keep the input order.
    pub fn run_batch(&self, requests: &[RefinementRequest]) -> Vec<AgentResult>
    where
        G: Sync,
    {
        thread::scope(|scope| {
            let handles: Vec<_> = requests
                .iter()
                .map(|request| scope.spawn(move || self.run(request, |_| {})))
                .collect();
            handles
                .into_iter()
                .zip(requests)
                .map(|(handle, request)| {
                    handle.join().unwrap_or_else(|_| {
                        warn!(term = %request.term, "refinement thread panicked");
                        aborted(request, "refinement thread panicked")
                    })
                })
                .collect()
        })
    }
}

fn insufficient_improvement(iteration: u32) -> String {
    format!("insufficient improvement in iteration {iteration}")
}

fn transition(state: &mut AgentState, next: AgentState) {
    debug!(from = ?*state, to = ?next, "state transition");
    *state = next;
}

fn text_of(iterations: &[IterationResult], iteration: u32) -> String {
    iterations
        .iter()
        .find(|result| result.iteration == iteration)
        .map(|result| result.candidate_text.clone())
        .unwrap_or_default()
}

fn aborted(request: &RefinementRequest, message: &str) -> AgentResult {
    AgentResult {
        term: request.term.clone(),
        category: request
            .category
            .unwrap_or_else(|| classify_quick(&request.term).category),
        final_text: String::new(),
        iterations: Vec::new(),
        total_time: std::time::Duration::ZERO,
        success: false,
        reason: StopReason::Error(message.to_string()).to_string(),
        best_iteration: None,
        score_history: Vec::new(),
        state: AgentState::Failed,
        diagnostic: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::rule_store::default_rule_configs;
    use crate::rules::builtin::default_registry;
    use crate::test_support::{ScriptedGenerator, word_rules};

    fn config(max_iterations: u32) -> RefinerConfig {
        let mut config = RefinerConfig::default();
        config.refinement.max_iterations = max_iterations;
        config
    }

    #[test]
    fn stop_reasons_render_result_text() {
        assert_eq!(StopReason::Accepted { iteration: 2 }.to_string(), "accepted in iteration 2");
        assert_eq!(
            StopReason::MaxIterations.to_string(),
            "maximum iterations reached without acceptable result"
        );
        assert_eq!(StopReason::Error("boom".into()).to_string(), "error: boom");
        assert_eq!(StopReason::Timeout.to_string(), "timeout");
    }

    #[test]
    fn accepted_first_time_has_no_feedback() {
        let (registry, configs) = word_rules(&[("STR-01", "alpha")]);
        let evaluator = Evaluator::new(&registry, &configs, 0.8);
        let generator = ScriptedGenerator::texts(&["clean text"]);
        let refinement = RefinementLoop::new(&generator, &evaluator, &config(3));

        let mut seen = Vec::new();
        let result = refinement.run(&RefinementRequest::new("registration"), |iteration| {
            seen.push(iteration.iteration)
        });

        assert!(result.success);
        assert_eq!(result.reason, "accepted in iteration 1");
        assert_eq!(result.final_text, "clean text");
        assert_eq!(result.state, AgentState::Completed);
        assert_eq!(result.category, Category::Process);
        assert!(result.iterations[0].feedback.is_empty());
        assert_eq!(seen, vec![1]);
    }

    #[test]
    fn regression_on_last_iteration_is_a_diagnostic_only() {
        let (registry, configs) = word_rules(&[
            ("R-01", "w1"),
            ("R-02", "w2"),
            ("R-03", "w3"),
            ("R-04", "w4"),
        ]);
        let evaluator = Evaluator::new(&registry, &configs, 0.8);
        let generator = ScriptedGenerator::texts(&["w1 w2", "w1", "w1 w2"]);
        let refinement = RefinementLoop::new(&generator, &evaluator, &config(3));

        let result = refinement.run(&RefinementRequest::new("permit"), |_| {});
        assert!(!result.success);
        assert_eq!(
            result.reason,
            "maximum iterations reached without acceptable result"
        );
        assert_eq!(
            result.diagnostic.as_deref(),
            Some("insufficient improvement in iteration 3")
        );
        assert_eq!(result.score_history, vec![0.5, 0.75, 0.5]);
        assert_eq!(result.best_iteration, Some(2));
        assert_eq!(result.final_text, "w1");
    }

    #[test]
    fn recovered_improvement_clears_the_diagnostic() {
        let (registry, configs) = word_rules(&[("R-01", "w1"), ("R-02", "w2")]);
        let evaluator = Evaluator::new(&registry, &configs, 0.8);
        let generator = ScriptedGenerator::texts(&["w1", "w1 w2", "w2"]);
        let refinement = RefinementLoop::new(&generator, &evaluator, &config(3));

        let result = refinement.run(&RefinementRequest::new("permit"), |_| {});
        assert_eq!(result.score_history, vec![0.5, 0.0, 0.5]);
        assert_eq!(
            result.reason,
            "maximum iterations reached without acceptable result"
        );
        assert_eq!(result.diagnostic, None);
        // Ties keep the earliest iteration.
        assert_eq!(result.best_iteration, Some(1));
        assert_eq!(result.final_text, "w1");
    }

    #[test]
    fn accumulated_feedback_is_capped_to_most_recent() {
        let (registry, configs) = word_rules(&[("R-01", "w1"), ("R-02", "w2"), ("R-03", "w3")]);
        let evaluator = Evaluator::new(&registry, &configs, 0.8);
        let generator = ScriptedGenerator::texts(&["w1 w2", "w1 w3", "clean"]);
        let mut cfg = config(3);
        cfg.refinement.feedback_context_limit = 1;
        let refinement = RefinementLoop::new(&generator, &evaluator, &cfg);

        let result = refinement.run(&RefinementRequest::new("permit"), |_| {});
        assert!(result.success);

        let seen = generator.feedback_seen();
        assert!(seen[0].is_empty());
        let first_feedback = &result.iterations[0].feedback;
        let expected: Vec<String> = first_feedback
            .iter()
            .skip(first_feedback.len().saturating_sub(1))
            .cloned()
            .collect();
        assert_eq!(seen[1], expected);
        assert_eq!(seen[2].len(), 1);
    }

    #[test]
    fn repeated_purpose_clause_is_reported_as_still_present() {
        let registry = default_registry();
        let configs = default_rule_configs().expect("configs");
        let evaluator = Evaluator::new(&registry, &configs, 0.8);
        let text = "activity in which an authority records the owner of a vehicle in order to keep a register under article 3 of the act";
        let generator = ScriptedGenerator::texts(&[text, text]);
        let refinement = RefinementLoop::new(&generator, &evaluator, &config(2));

        let request = RefinementRequest::new("registration").with_category(Category::Process);
        let result = refinement.run(&request, |_| {});

        let first = &result.iterations[0].feedback;
        assert!(first.contains(&"Avoid these phrasings: 'in order to'.".to_string()), "{first:?}");
        let second = &result.iterations[1].feedback;
        assert_eq!(
            second[0],
            "Still present after 1 attempt(s): 'in order to'. Replace them with neutral wording."
        );
        assert!(
            second.contains(
                &"Retain these elements that already pass: 'article 3', 'activity in which', implicit context."
                    .to_string()
            ),
            "{second:?}"
        );
    }

    #[test]
    fn explicit_category_skips_classification() {
        let (registry, configs) = word_rules(&[("R-01", "w1")]);
        let evaluator = Evaluator::new(&registry, &configs, 0.8);
        let generator = ScriptedGenerator::texts(&["clean"]);
        let refinement = RefinementLoop::new(&generator, &evaluator, &config(1));

        let request = RefinementRequest::new("registration").with_category(Category::Result);
        let result = refinement.run(&request, |_| {});
        assert_eq!(result.category, Category::Result);
        assert_eq!(result.iterations[0].verdict.category, Some(Category::Result));
    }
}
