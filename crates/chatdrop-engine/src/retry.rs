//! The retry loop around injector evaluations.
//!
//! This is the only place that turns a failed attempt into a continue-or-stop
//! decision. Every failure kind counts against the same budget.

use crate::backend::Backend;
use chatdrop_common::config::schema::TimingConfig;
use chatdrop_common::protocol::{ElementKind, InsertionReport, TabId};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Console notice written into the page once the budget is spent.
pub const EXHAUSTED_NOTICE: &str =
    "chatdrop could not insert the text automatically. Please paste it into the prompt manually.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// No element matched any locator or fallback.
    LocatorResolution,
    /// An element was found but writing into it failed.
    Insertion(String),
    /// The evaluation could not run at all (tab gone, timeout, ...).
    HostEvaluation(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::LocatorResolution => f.write_str("input field not found"),
            AttemptFailure::Insertion(reason) => write!(f, "insertion failed: {}", reason),
            AttemptFailure::HostEvaluation(reason) => write!(f, "evaluation failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Inserted { kind: Option<ElementKind> },
    Failed(AttemptFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionAttempt {
    pub number: u32,
    pub locator: Option<String>,
    pub outcome: AttemptOutcome,
}

impl InsertionAttempt {
    fn from_report(number: u32, report: InsertionReport) -> Self {
        let outcome = if report.inserted {
            AttemptOutcome::Inserted { kind: report.kind }
        } else if let Some(reason) = report.failure {
            AttemptOutcome::Failed(AttemptFailure::Insertion(reason))
        } else {
            AttemptOutcome::Failed(AttemptFailure::LocatorResolution)
        };
        Self {
            number,
            locator: report.locator,
            outcome,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Inserted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    Attempting,
    Succeeded,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempts_made: u32,
    max_attempts: u32,
    base_interval: Duration,
}

impl RetryState {
    pub fn new(max_attempts: u32, base_interval: Duration) -> Self {
        Self {
            attempts_made: 0,
            max_attempts: max_attempts.max(1),
            base_interval,
        }
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Count a failed attempt and decide what comes next.
    pub fn record_failure(&mut self) -> RetryPhase {
        self.attempts_made += 1;
        if self.attempts_made >= self.max_attempts {
            RetryPhase::Exhausted
        } else {
            RetryPhase::Attempting
        }
    }

    /// Wait before the next attempt: linear in the failures so far.
    pub fn backoff(&self) -> Duration {
        self.base_interval * self.attempts_made
    }
}

/// Final state of one retry-loop run and the attempts it made.
#[derive(Debug, Clone)]
pub struct RetryReport {
    pub phase: RetryPhase,
    pub attempts: Vec<InsertionAttempt>,
}

impl RetryReport {
    pub fn succeeded(&self) -> bool {
        self.phase == RetryPhase::Succeeded
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryLoop {
    max_attempts: u32,
    base_interval: Duration,
}

impl RetryLoop {
    pub fn new(max_attempts: u32, base_interval: Duration) -> Self {
        Self {
            max_attempts,
            base_interval,
        }
    }

    pub fn from_timing(timing: &TimingConfig) -> Self {
        Self::new(timing.max_attempts, timing.retry_interval())
    }

    pub async fn run<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        tab: TabId,
        text: &str,
        locators: &[String],
    ) -> RetryReport {
        let mut state = RetryState::new(self.max_attempts, self.base_interval);
        let mut attempts = Vec::new();

        loop {
            let number = state.attempts_made() + 1;
            let attempt = match backend.insert_text(tab, text, locators).await {
                Ok(report) => InsertionAttempt::from_report(number, report),
                Err(e) => InsertionAttempt {
                    number,
                    locator: None,
                    outcome: AttemptOutcome::Failed(AttemptFailure::HostEvaluation(e.to_string())),
                },
            };

            if attempt.succeeded() {
                info!(
                    "Text inserted into tab {} on attempt {} ({})",
                    tab,
                    number,
                    attempt.locator.as_deref().unwrap_or("unknown locator")
                );
                attempts.push(attempt);
                return RetryReport {
                    phase: RetryPhase::Succeeded,
                    attempts,
                };
            }

            if let AttemptOutcome::Failed(failure) = &attempt.outcome {
                debug!(
                    "Attempt {}/{} for tab {} failed: {}",
                    number,
                    state.max_attempts(),
                    tab,
                    failure
                );
            }
            attempts.push(attempt);

            match state.record_failure() {
                RetryPhase::Exhausted => break,
                _ => tokio::time::sleep(state.backoff()).await,
            }
        }

        error!(
            "Failed to insert text into tab {} after {} attempts",
            tab,
            state.attempts_made()
        );
        if let Err(e) = backend.notify(tab, EXHAUSTED_NOTICE).await {
            warn!("Could not show notice in tab {}: {}", tab, e);
        }

        RetryReport {
            phase: RetryPhase::Exhausted,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff() {
        let mut state = RetryState::new(3, Duration::from_millis(500));
        assert_eq!(state.record_failure(), RetryPhase::Attempting);
        assert_eq!(state.backoff(), Duration::from_millis(500));
        assert_eq!(state.record_failure(), RetryPhase::Attempting);
        assert_eq!(state.backoff(), Duration::from_millis(1000));
        assert_eq!(state.record_failure(), RetryPhase::Exhausted);
    }

    #[test]
    fn zero_budget_still_allows_one_attempt() {
        let mut state = RetryState::new(0, Duration::from_millis(10));
        assert_eq!(state.max_attempts(), 1);
        assert_eq!(state.record_failure(), RetryPhase::Exhausted);
    }

    #[test]
    fn attempt_classification() {
        let found_but_failed = InsertionReport::failed("textarea", ElementKind::TextArea, true, "boom");
        let attempt = InsertionAttempt::from_report(2, found_but_failed);
        assert_eq!(
            attempt.outcome,
            AttemptOutcome::Failed(AttemptFailure::Insertion("boom".into()))
        );
        assert_eq!(attempt.locator.as_deref(), Some("textarea"));

        let missing = InsertionReport::not_found(Default::default(), true);
        let attempt = InsertionAttempt::from_report(1, missing);
        assert_eq!(
            attempt.outcome,
            AttemptOutcome::Failed(AttemptFailure::LocatorResolution)
        );
    }
}
