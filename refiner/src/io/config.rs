//! Refiner configuration stored as TOML (e.g. `refiner.toml`).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::feedback::FeedbackLimits;

/// Refiner configuration (TOML).
///
/// Meant to be edited by humans. Missing fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefinerConfig {
    pub refinement: RefinementConfig,
    pub feedback: FeedbackLimits,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefinementConfig {
    /// Maximum number of generate/validate cycles per run.
    pub max_iterations: u32,

    /// Minimum overall score (together with zero FAIL outcomes) to accept a candidate.
    pub acceptance_threshold: f64,

    /// Score gain below which an iteration is reported as insufficient improvement.
    pub min_improvement: f64,

    /// Number of most recent feedback items passed to the generator.
    pub feedback_context_limit: usize,

    /// Wall-clock budget for one run. Unset means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            acceptance_threshold: 0.8,
            min_improvement: 0.05,
            feedback_context_limit: 10,
            timeout_secs: None,
        }
    }
}

impl RefinementConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Command that reads a prompt on stdin and prints a definition
    /// (e.g. `["llm", "-m", "model"]`). Required by `refiner refine`.
    pub command: Vec<String>,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Truncate generator stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl RefinerConfig {
    pub fn validate(&self) -> Result<()> {
        let refinement = &self.refinement;
        if refinement.max_iterations == 0 {
            return Err(anyhow!("refinement.max_iterations must be > 0"));
        }
        if !(0.0..=1.0).contains(&refinement.acceptance_threshold) {
            return Err(anyhow!("refinement.acceptance_threshold must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&refinement.min_improvement) {
            return Err(anyhow!("refinement.min_improvement must be within [0, 1]"));
        }
        if refinement.timeout_secs == Some(0) {
            return Err(anyhow!("refinement.timeout_secs must be > 0 when set"));
        }
        if self.feedback.max_items == 0 {
            return Err(anyhow!("feedback.max_items must be > 0"));
        }
        if self.feedback.stagnation_epsilon < 0.0 {
            return Err(anyhow!("feedback.stagnation_epsilon must be >= 0"));
        }
        if self.generator.timeout_secs == 0 {
            return Err(anyhow!("generator.timeout_secs must be > 0"));
        }
        if self.generator.output_limit_bytes == 0 {
            return Err(anyhow!("generator.output_limit_bytes must be > 0"));
        }
        if self
            .generator
            .command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(anyhow!("generator.command must start with a program name"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RefinerConfig::default()`.
pub fn load_config(path: &Path) -> Result<RefinerConfig> {
    if !path.exists() {
        let cfg = RefinerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RefinerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RefinerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
