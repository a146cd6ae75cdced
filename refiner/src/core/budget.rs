//! Wall-clock budget helpers for a refinement run.

use std::time::{Duration, Instant};

/// Deadline for a run started at `start`, if a timeout is configured.
pub fn deadline_after(start: Instant, timeout: Option<Duration>) -> Option<Instant> {
    timeout.map(|timeout| start + timeout)
}

/// Time left until `deadline`, or `None` once it has passed.
pub fn remaining_budget(deadline: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|remaining| !remaining.is_zero())
}

pub fn is_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| remaining_budget(deadline).is_none())
}
