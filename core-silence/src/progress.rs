//! Progress reporting for one run.
//!
//! Wraps the caller's two callbacks and enforces the reporting rules: percent
//! values are clamped to 0-100 and never move backwards within a phase,
//! identical values are not repeated, and 100 is reported exactly once.

use tracing::debug;

/// Message callback type accepted by the engine.
pub type MessageFn<'a> = dyn FnMut(&str) + Send + 'a;
/// Percent callback type accepted by the engine.
pub type PercentFn<'a> = dyn FnMut(u8) + Send + 'a;

pub struct ProgressReporter<'a> {
    on_message: &'a mut MessageFn<'a>,
    on_percent: &'a mut PercentFn<'a>,
    last_percent: Option<u8>,
    completed: bool,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(on_message: &'a mut MessageFn<'a>, on_percent: &'a mut PercentFn<'a>) -> Self {
        Self {
            on_message,
            on_percent,
            last_percent: None,
            completed: false,
        }
    }

    /// Report a human-readable status line.
    pub fn message(&mut self, message: &str) {
        debug!(message, "Progress");
        (self.on_message)(message);
    }

    /// Report a percentage. Values above 99 are held at 99 until
    /// [`complete`](Self::complete) is called.
    pub fn percent(&mut self, value: f64) {
        if self.completed {
            return;
        }
        let value = if value.is_finite() { value } else { 0.0 };
        let clamped = value.round().clamp(0.0, 99.0) as u8;
        if self.last_percent.is_some_and(|last| clamped <= last) {
            return;
        }
        self.last_percent = Some(clamped);
        (self.on_percent)(clamped);
    }

    /// Report `done / total` as a percentage scaled into `[from, to]`.
    pub fn fraction(&mut self, done: u64, total: u64, from: f64, to: f64) {
        if total == 0 {
            return;
        }
        let ratio = (done as f64 / total as f64).clamp(0.0, 1.0);
        self.percent(from + ratio * (to - from));
    }

    /// Report completion. Only the first call has an effect.
    pub fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.last_percent = Some(100);
        (self.on_percent)(100);
    }

    /// Start a new phase (the fallback path) whose percentages begin at 0.
    pub fn restart(&mut self) {
        if !self.completed {
            self.last_percent = None;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<F: FnOnce(&mut ProgressReporter<'_>)>(drive: F) -> (Vec<String>, Vec<u8>) {
        let mut messages = Vec::new();
        let mut percents = Vec::new();
        {
            let mut on_message = |m: &str| messages.push(m.to_string());
            let mut on_percent = |p: u8| percents.push(p);
            let mut reporter = ProgressReporter::new(&mut on_message, &mut on_percent);
            drive(&mut reporter);
        }
        (messages, percents)
    }

    #[test]
    fn percent_is_monotonic_and_deduplicated() {
        let (_, percents) = collect(|r| {
            r.percent(10.0);
            r.percent(10.2);
            r.percent(5.0);
            r.percent(40.0);
        });
        assert_eq!(percents, vec![10, 40]);
    }

    #[test]
    fn completion_reported_once() {
        let (_, percents) = collect(|r| {
            r.percent(150.0);
            r.complete();
            r.complete();
            r.percent(50.0);
        });
        assert_eq!(percents, vec![99, 100]);
    }

    #[test]
    fn restart_allows_new_phase() {
        let (messages, percents) = collect(|r| {
            r.percent(60.0);
            r.message("Falling back");
            r.restart();
            r.percent(0.0);
            r.fraction(1, 2, 0.0, 90.0);
        });
        assert_eq!(messages, vec!["Falling back".to_string()]);
        assert_eq!(percents, vec![60, 0, 45]);
    }

    #[test]
    fn fraction_ignores_unknown_total() {
        let (_, percents) = collect(|r| r.fraction(10, 0, 0.0, 100.0));
        assert!(percents.is_empty());
    }
}
