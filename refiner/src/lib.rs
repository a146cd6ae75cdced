//! Iterative definition refinement.
//!
//! A generator proposes a one-sentence definition for a term, a registry of
//! rules judges it, and synthesized feedback steers the next attempt until a
//! candidate is accepted or the run stops.
//!
//! - **[`core`]**: Pure, deterministic logic (types, scoring, feedback, quick
//!   classification). No I/O, fully testable in isolation.
//! - **[`rules`]**: Rule families, pattern matching and the rule registry.
//! - **[`io`]**: Side-effecting adapters (config and rule files, the command
//!   generator, lookup collaborators).
//!
//! Orchestration modules ([`evaluate`], [`classify`], [`looping`]) combine
//! them to implement the CLI commands.

pub mod classify;
pub mod core;
pub mod error;
pub mod evaluate;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod rules;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
