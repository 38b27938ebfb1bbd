//! Pass/fail bookkeeping for suites.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use s3probe_core::ProbeResult;
use tracing::{info, warn};

/// Outcome of one suite step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The step completed.
    Passed,
    /// The step failed with the given error message.
    Failed(String),
}

/// One recorded step.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Step name.
    pub name: &'static str,
    /// Outcome.
    pub status: StepStatus,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// All steps of one suite run, in execution order.
///
/// A failing step never aborts the suite; later steps still run and report
/// their own outcome.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    /// Suite name.
    pub suite: &'static str,
    /// Recorded steps.
    pub steps: Vec<StepReport>,
}

impl SuiteReport {
    /// Start an empty report.
    #[must_use]
    pub fn new(suite: &'static str) -> Self {
        Self {
            suite,
            steps: Vec::new(),
        }
    }

    /// Run `fut` as step `name`, record its outcome and hand back its value.
    pub async fn step<T, F>(&mut self, name: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = ProbeResult<T>>,
    {
        info!(suite = self.suite, step = name, "running step");
        let started = Instant::now();
        let result = fut.await;
        let elapsed = started.elapsed();

        let (status, value) = match result {
            Ok(value) => (StepStatus::Passed, Some(value)),
            Err(e) => {
                warn!(suite = self.suite, step = name, error = %e, "step failed");
                (StepStatus::Failed(e.to_string()), None)
            }
        };
        self.steps.push(StepReport {
            name,
            status,
            elapsed,
        });
        value
    }

    /// Number of passed steps.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Passed)
            .count()
    }

    /// Steps that failed.
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    /// True when no step failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} of {} steps passed",
            self.suite,
            self.passed(),
            self.steps.len()
        )?;
        for step in &self.steps {
            match &step.status {
                StepStatus::Passed => writeln!(f, "  ok    {} ({:?})", step.name, step.elapsed)?,
                StepStatus::Failed(e) => writeln!(f, "  FAIL  {}: {e}", step.name)?,
            }
        }
        Ok(())
    }
}
