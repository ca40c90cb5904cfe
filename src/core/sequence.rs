//! Sequential batch execution and per-item outcome reporting.
//!
//! Restore and removal flows walk their targets strictly in order, one at a
//! time, and record one outcome per target. A failing target never aborts
//! the batch; later targets still run and the report carries every result.

use std::fmt;

/// Outcome of attempting one step of a batch.
#[derive(Debug)]
pub enum StepStatus {
    /// Step ran and completed.
    Done,
    /// Step was intentionally not run.
    Skipped {
        /// Human-readable reason, e.g. `already installed`.
        reason: String,
    },
    /// Step ran and failed.
    Failed {
        /// The underlying error, preserved for the final report.
        error: anyhow::Error,
    },
}

impl StepStatus {
    /// Check whether this status counts against batch success.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::Failed { error } => write!(f, "failed: {error:#}"),
        }
    }
}

/// One named entry in a batch report.
#[derive(Debug)]
pub struct StepOutcome {
    /// Target the step operated on, e.g. `ios` or `cordova-plugin-camera`.
    pub name: String,
    pub status: StepStatus,
}

/// Accumulated outcomes for a whole batch of targets.
///
/// Flows thread one report through every target they touch, then hand it to
/// the caller to decide the process exit code.
#[derive(Debug, Default)]
pub struct BatchReport {
    steps: Vec<StepOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `name`, logging failures and skips as they land.
    pub fn record(&mut self, name: impl Into<String>, status: StepStatus) {
        let name = name.into();
        match &status {
            StepStatus::Failed { error } => {
                tracing::warn!("{name}: {error:#}");
            }
            StepStatus::Skipped { reason } => {
                tracing::debug!("{name}: skipped ({reason})");
            }
            StepStatus::Done => {}
        }
        self.steps.push(StepOutcome { name, status });
    }

    pub fn record_done(&mut self, name: impl Into<String>) {
        self.record(name, StepStatus::Done);
    }

    pub fn record_skipped(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.record(name, StepStatus::Skipped { reason: reason.into() });
    }

    pub fn record_failed(&mut self, name: impl Into<String>, error: anyhow::Error) {
        self.record(name, StepStatus::Failed { error });
    }

    /// All recorded outcomes, in execution order.
    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    /// Whether every recorded step either completed or was skipped.
    pub fn success(&self) -> bool {
        !self.steps.iter().any(|s| s.status.is_failure())
    }

    pub fn done_count(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s.status, StepStatus::Done)).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_skipped()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_failure()).count()
    }

    /// Iterate over the failing steps only.
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.status.is_failure())
    }

    /// Append every outcome from `other` onto this report.
    pub fn merge(&mut self, other: BatchReport) {
        self.steps.extend(other.steps);
    }

    /// Process exit code for this batch: 0 when clean, 1 when anything failed.
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.success())
    }
}
