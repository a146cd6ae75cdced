//! Stable exit codes for refiner CLI commands.

/// Command succeeded; the candidate was acceptable or the run succeeded.
pub const OK: i32 = 0;
/// Invalid input, configuration or rule files, or any other error.
pub const INVALID: i32 = 1;
/// `refiner evaluate` rejected the candidate or `refiner refine` found no acceptable definition.
pub const REJECTED: i32 = 2;
