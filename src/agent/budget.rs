//! Iteration and wall-clock ceilings for a turn.

use std::time::Duration;

use tokio::time::Instant;

use crate::base::types::Budget;

/// Configured ceilings; both apply independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetLimits {
    pub max_iterations: usize,
    pub max_duration: Duration,
}

/// Tracks what a turn has used so far. Created fresh at the start of every turn.
#[derive(Debug)]
pub struct BudgetGuard {
    limits: BudgetLimits,
    started: Instant,
    iterations_used: usize,
}

impl BudgetGuard {
    pub fn start(limits: BudgetLimits) -> Self {
        Self {
            limits,
            started: Instant::now(),
            iterations_used: 0,
        }
    }

    pub fn record_iteration(&mut self) {
        self.iterations_used += 1;
    }

    pub fn iterations_used(&self) -> usize {
        self.iterations_used
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the wall-clock ceiling; zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.limits.max_duration.saturating_sub(self.elapsed())
    }

    pub fn time_budget(&self) -> Budget {
        Budget::Time { limit: self.limits.max_duration }
    }

    /// The first exhausted budget, if any. Iterations are checked first.
    pub fn exhausted(&self) -> Option<Budget> {
        if self.iterations_used >= self.limits.max_iterations {
            return Some(Budget::Iterations { limit: self.limits.max_iterations });
        }

        if self.elapsed() >= self.limits.max_duration {
            return Some(self.time_budget());
        }

        None
    }
}
