//! Cooperative scheduling helpers.
//!
//! Long sequential loops (reading a file chunk by chunk, submitting coded
//! frames to a decoder) must hand control back to the executor regularly so
//! that progress callbacks, cancellation and other tasks are not starved.
//! [`YieldBudget`] tracks wall time since the last suspension and yields once
//! the configured interval has elapsed.

use crate::task::yield_now;
use std::time::{Duration, Instant};

/// Wall-clock budget between cooperative yields.
#[derive(Debug)]
pub struct YieldBudget {
    interval: Duration,
    last_yield: Instant,
    yields: u64,
}

impl YieldBudget {
    /// Create a budget that yields at least every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_yield: Instant::now(),
            yields: 0,
        }
    }

    /// Returns `true` when the budget is spent and the caller should yield.
    pub fn is_exhausted(&self) -> bool {
        self.last_yield.elapsed() >= self.interval
    }

    /// Yield to the executor if the budget is spent.
    ///
    /// Returns `true` when a yield actually happened.
    pub async fn tick(&mut self) -> bool {
        if !self.is_exhausted() {
            return false;
        }
        self.yield_now().await;
        true
    }

    /// Yield unconditionally and reset the budget.
    pub async fn yield_now(&mut self) {
        yield_now().await;
        self.yields += 1;
        self.last_yield = Instant::now();
    }

    /// Record a suspension that happened elsewhere (for example a sleep while
    /// waiting for decoder capacity) so the next tick does not yield again
    /// immediately.
    pub fn reset(&mut self) {
        self.last_yield = Instant::now();
    }

    /// Number of yields performed so far.
    pub fn yields(&self) -> u64 {
        self.yields
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_budget_does_not_yield() {
        let mut budget = YieldBudget::new(Duration::from_secs(60));
        assert!(!budget.tick().await);
        assert_eq!(budget.yields(), 0);
    }

    #[tokio::test]
    async fn zero_interval_always_yields() {
        let mut budget = YieldBudget::new(Duration::ZERO);
        assert!(budget.tick().await);
        assert!(budget.tick().await);
        assert_eq!(budget.yields(), 2);
    }

    #[tokio::test]
    async fn yields_after_interval_elapses() {
        let mut budget = YieldBudget::new(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(budget.is_exhausted());
        assert!(budget.tick().await);
        assert!(!budget.is_exhausted());
    }
}
