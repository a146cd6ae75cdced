//! Iterative definition refiner.
//!
//! Judges candidate definitions against a rule registry, classifies terms,
//! and drives a generator through feedback-guided refinement. Results are
//! printed to stdout as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use refiner::classify::OntologyClassifier;
use refiner::core::classifier::classify_quick;
use refiner::core::types::{Candidate, CandidateContext, Category};
use refiner::evaluate::Evaluator;
use refiner::exit_codes;
use refiner::io::config::{RefinerConfig, load_config, write_config};
use refiner::io::generator::CommandGenerator;
use refiner::io::lookup::{NoLookup, PatternSourceRecognizer};
use refiner::io::rule_store::rule_configs_or_default;
use refiner::logging;
use refiner::looping::{RefinementLoop, RefinementRequest};
use refiner::rules::builtin::default_registry;

const DEFAULT_CONFIG: &str = "refiner.toml";

#[derive(Parser)]
#[command(
    name = "refiner",
    version,
    about = "Rule-guided iterative refinement of term definitions"
)]
struct Cli {
    /// Path to the TOML configuration. Defaults apply when it is missing.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Judge one candidate definition and print the verdict.
    Evaluate {
        term: String,
        text: String,
        /// Evaluate under this category instead of the classified one.
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        /// Rule configuration JSON. Built-in rules when omitted.
        #[arg(long)]
        rules: Option<PathBuf>,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Classify a term into type, process, result or instance.
    Classify {
        term: String,
        /// Run the full classifier instead of the quick lexical one.
        #[arg(long)]
        full: bool,
        #[arg(long)]
        domain: Option<String>,
    },
    /// Refine a definition with the configured generator command.
    Refine {
        term: String,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[command(flatten)]
        context: ContextArgs,
    },
}

#[derive(Args)]
struct ContextArgs {
    /// Organizational context reference (repeatable).
    #[arg(long = "organizational")]
    organizational: Vec<String>,
    /// Legal context reference (repeatable).
    #[arg(long = "legal")]
    legal: Vec<String>,
    /// Statutory context reference (repeatable).
    #[arg(long = "statutory")]
    statutory: Vec<String>,
    /// Authoritative category, checked by multi-category rules.
    #[arg(long)]
    category_override: Option<String>,
}

impl From<ContextArgs> for CandidateContext {
    fn from(args: ContextArgs) -> Self {
        CandidateContext {
            organizational: args.organizational,
            legal: args.legal,
            statutory: args.statutory,
            category_override: args.category_override,
        }
    }
}

fn parse_category(value: &str) -> std::result::Result<Category, String> {
    Category::parse(value).ok_or_else(|| {
        format!("unknown category '{value}': expected one of type, process, result, instance")
    })
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Evaluate {
            term,
            text,
            category,
            rules,
            context,
        } => {
            let config = load_config(&cli.config)?;
            cmd_evaluate(&config, &term, &text, category, rules.as_deref(), context.into())
        }
        Command::Classify { term, full, domain } => cmd_classify(&term, full, domain.as_deref()),
        Command::Refine {
            term,
            category,
            rules,
            context,
        } => {
            let config = load_config(&cli.config)?;
            cmd_refine(&config, &term, category, rules.as_deref(), context.into())
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if !force && path.exists() {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &RefinerConfig::default())?;
    println!("{}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_evaluate(
    config: &RefinerConfig,
    term: &str,
    text: &str,
    category: Option<Category>,
    rules: Option<&Path>,
    context: CandidateContext,
) -> Result<i32> {
    let configs = rule_configs_or_default(rules)?;
    let registry = default_registry();
    let evaluator = Evaluator::new(
        &registry,
        &configs,
        config.refinement.acceptance_threshold,
    );
    let category = category.unwrap_or_else(|| classify_quick(term).category);
    let candidate = Candidate::new(term, text).with_context(context);
    let verdict = evaluator.evaluate(&candidate, Some(category));
    print_json(&verdict)?;
    Ok(if verdict.acceptable {
        exit_codes::OK
    } else {
        exit_codes::REJECTED
    })
}

fn cmd_classify(term: &str, full: bool, domain: Option<&str>) -> Result<i32> {
    if term.trim().is_empty() {
        bail!("term must not be empty");
    }
    if full {
        let sources = PatternSourceRecognizer;
        let classifier = OntologyClassifier::new(&NoLookup, &NoLookup, &sources);
        print_json(&classifier.classify(term, domain))?;
    } else {
        let quick = classify_quick(term);
        print_json(&serde_json::json!({
            "term": term.trim(),
            "category": quick.category,
            "justification": quick.justification,
        }))?;
    }
    Ok(exit_codes::OK)
}

fn cmd_refine(
    config: &RefinerConfig,
    term: &str,
    category: Option<Category>,
    rules: Option<&Path>,
    context: CandidateContext,
) -> Result<i32> {
    if term.trim().is_empty() {
        bail!("term must not be empty");
    }
    let generator = CommandGenerator::new(&config.generator)
        .context("refine needs [generator].command in the configuration")?;
    let configs = rule_configs_or_default(rules)?;
    let registry = default_registry();
    let evaluator = Evaluator::new(
        &registry,
        &configs,
        config.refinement.acceptance_threshold,
    );
    let refinement = RefinementLoop::new(&generator, &evaluator, config);

    let mut request = RefinementRequest::new(term.trim()).with_context(context);
    if let Some(category) = category {
        request = request.with_category(category);
    }
    let result = refinement.run(&request, |iteration| {
        eprintln!(
            "iteration {}: score {:.3}",
            iteration.iteration, iteration.verdict.overall_score
        );
    });
    print_json(&result)?;
    Ok(if result.success {
        exit_codes::OK
    } else {
        exit_codes::REJECTED
    })
}

/// Print `value` to stdout as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
