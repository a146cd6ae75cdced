//! End-to-end refinement runs over scripted generators.
//!
//! Drives `RefinementLoop` through acceptance, exhaustion, generator failure,
//! time budget and batch paths using the public API only.

use std::time::Duration;

use refiner::core::types::{AgentState, Category, IterationStatus};
use refiner::evaluate::Evaluator;
use refiner::io::config::RefinerConfig;
use refiner::looping::{RefinementLoop, RefinementRequest};
use refiner::test_support::{FixedGenerator, ScriptedGenerator, word_rules};

fn config(max_iterations: u32) -> RefinerConfig {
    let mut config = RefinerConfig::default();
    config.refinement.max_iterations = max_iterations;
    config
}

/// Verifies feedback from a rejected first attempt reaches the generator and
/// the corrected second attempt is accepted.
#[test]
fn rejected_then_accepted_after_feedback() {
    let (registry, configs) = word_rules(&[("STR-01", "alpha"), ("STR-02", "beta"), ("ESS-01", "gamma")]);
    let evaluator = Evaluator::new(&registry, &configs, 0.8);
    let generator = ScriptedGenerator::texts(&[
        "gamma activity in which a record is kept",
        "activity in which a record is kept",
    ]);
    let config = config(3);
    let refinement = RefinementLoop::new(&generator, &evaluator, &config);
    let request = RefinementRequest::new("registration").with_category(Category::Process);

    let mut seen = Vec::new();
    let result = refinement.run(&request, |iteration| seen.push(iteration.iteration));

    assert!(result.success);
    assert_eq!(result.reason, "accepted in iteration 2");
    assert_eq!(result.state, AgentState::Completed);
    assert_eq!(seen, vec![1, 2]);
    assert_eq!(result.final_text, "activity in which a record is kept");

    let first = &result.iterations[0];
    assert_eq!(first.status, IterationStatus::Rejected);
    assert!((first.verdict.overall_score - 2.0 / 3.0).abs() < 1e-9);
    assert!(!first.verdict.acceptable);
    assert!(
        first
            .feedback
            .iter()
            .any(|item| item.contains("ESS-01: Describe what the term is")),
        "{:?}",
        first.feedback
    );

    let second = &result.iterations[1];
    assert_eq!(second.status, IterationStatus::Accepted);
    assert!(second.feedback.is_empty());

    let feedback_seen = generator.feedback_seen();
    assert!(feedback_seen[0].is_empty());
    assert!(
        feedback_seen[1]
            .iter()
            .any(|item| item.contains("Describe what the term is"))
    );
}

/// Verifies an improving but never acceptable run reports exhaustion and
/// keeps the best attempt.
#[test]
fn exhausted_run_keeps_best_iteration() {
    let (registry, configs) =
        word_rules(&[("R-01", "w1"), ("R-02", "w2"), ("R-03", "w3"), ("R-04", "w4")]);
    let evaluator = Evaluator::new(&registry, &configs, 0.8);
    let generator = ScriptedGenerator::texts(&["w1 w2 w3", "w1 w2", "w1"]);
    let config = config(3);
    let refinement = RefinementLoop::new(&generator, &evaluator, &config);

    let result = refinement.run(
        &RefinementRequest::new("permit").with_category(Category::Result),
        |_| {},
    );

    assert!(!result.success);
    assert_eq!(result.reason, "maximum iterations reached without acceptable result");
    assert_eq!(result.state, AgentState::Failed);
    assert_eq!(result.score_history, vec![0.25, 0.5, 0.75]);
    assert_eq!(result.best_iteration, Some(3));
    assert_eq!(result.final_text, "w1");
    assert_eq!(result.best().map(|best| best.iteration), Some(3));
}

/// Verifies a flat score history still ends with the exhaustion reason and
/// reports the missing improvement separately.
#[test]
fn plateau_reports_exhaustion_not_insufficient_improvement() {
    let (registry, configs) = word_rules(&[("R-01", "w1"), ("R-02", "w2")]);
    let evaluator = Evaluator::new(&registry, &configs, 0.8);
    let generator = ScriptedGenerator::texts(&["w1 a", "w1 b", "w1 c"]);
    let config = config(3);
    let refinement = RefinementLoop::new(&generator, &evaluator, &config);

    let result = refinement.run(&RefinementRequest::new("permit"), |_| {});

    assert!(!result.success);
    assert_eq!(result.score_history, vec![0.5, 0.5, 0.5]);
    assert_eq!(result.reason, "maximum iterations reached without acceptable result");
    assert_eq!(result.best_iteration, Some(1));
    assert_eq!(result.final_text, "w1 a");
    assert_eq!(
        result.diagnostic.as_deref(),
        Some("insufficient improvement in iteration 3")
    );
}

/// Verifies a generator failure ends the run with the error text and the best
/// text produced so far.
#[test]
fn generator_error_stops_the_run() {
    let (registry, configs) = word_rules(&[("R-01", "w1"), ("R-02", "w2")]);
    let evaluator = Evaluator::new(&registry, &configs, 0.8);
    let generator = ScriptedGenerator::new(vec![Ok("w1 definition"), Err("backend unavailable")]);
    let config = config(3);
    let refinement = RefinementLoop::new(&generator, &evaluator, &config);

    let result = refinement.run(&RefinementRequest::new("vehicle"), |_| {});

    assert!(!result.success);
    assert_eq!(result.reason, "error: backend unavailable");
    assert_eq!(result.state, AgentState::Failed);
    assert_eq!(result.iterations.len(), 1);
    assert_eq!(result.final_text, "w1 definition");
    assert_eq!(result.category, Category::Type);
}

/// Verifies the time budget is checked before each generation.
#[test]
fn time_budget_stops_before_next_iteration() {
    let (registry, configs) = word_rules(&[("R-01", "w1")]);
    let evaluator = Evaluator::new(&registry, &configs, 0.8);
    let generator = FixedGenerator::new()
        .with_text("inspection", "w1 activity")
        .with_delay(Duration::from_millis(1100));
    let mut config = config(3);
    config.refinement.timeout_secs = Some(1);
    let refinement = RefinementLoop::new(&generator, &evaluator, &config);

    let result = refinement.run(&RefinementRequest::new("inspection"), |_| {});

    assert_eq!(result.reason, "timeout");
    assert_eq!(result.iterations.len(), 1);
    assert!(!result.success);
    assert!(result.total_time >= Duration::from_millis(1100));
}

/// Verifies batch results come back in request order.
#[test]
fn batch_results_keep_request_order() {
    let (registry, configs) = word_rules(&[("R-01", "forbidden")]);
    let evaluator = Evaluator::new(&registry, &configs, 0.8);
    let generator = FixedGenerator::new()
        .with_text("registration", "activity in which a record is kept")
        .with_text("permit", "forbidden wording")
        .with_text("vehicle", "kind of conveyance");
    let config = config(2);
    let refinement = RefinementLoop::new(&generator, &evaluator, &config);

    let requests = vec![
        RefinementRequest::new("registration"),
        RefinementRequest::new("permit"),
        RefinementRequest::new("vehicle"),
    ];
    let results = refinement.run_batch(&requests);

    let terms: Vec<&str> = results.iter().map(|result| result.term.as_str()).collect();
    assert_eq!(terms, vec!["registration", "permit", "vehicle"]);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].iterations.len(), 2);
    assert!(results[2].success);
    assert_eq!(results[0].category, Category::Process);
}
