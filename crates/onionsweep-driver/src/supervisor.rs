//! Sequential sweep execution with resume and retry.
//!
//! Scenarios run strictly one at a time: a scenario's daemons and
//! measurement processes own the ports the next scenario needs, so the
//! sequential loop is the only coordination between them.

use async_trait::async_trait;
use onionsweep_common::{Error, Result};
use onionsweep_scenario::SweepEntry;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Executes one scenario, writing its result to `output`.
#[async_trait]
pub trait ScenarioRunner: Send {
    async fn run(&mut self, entry: &SweepEntry, output: &Path) -> Result<()>;
}

/// How often, and how patiently, a failing scenario is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per scenario; `None` retries until the scenario succeeds.
    pub max_attempts: Option<u32>,
    pub delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl RetryPolicy {
    /// Retry forever with a constant one-second pause.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::from_secs(1),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_secs(30),
        }
    }

    /// At most `max_attempts` attempts with no pause in between.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Pause after failed attempt `attempt` (1-based):
    /// `delay * multiplier^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Whether another attempt may follow failed attempt `attempt`.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Outcome counters of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Scenarios that ran to completion in this invocation.
    pub executed: usize,
    /// Scenarios whose output already existed.
    pub skipped: usize,
    /// Failed attempts across all scenarios.
    pub failed_attempts: usize,
}

/// Walks a sweep in order, resuming from whatever output already exists.
#[derive(Debug, Clone)]
pub struct SweepSupervisor {
    root: PathBuf,
    policy: RetryPolicy,
}

impl SweepSupervisor {
    pub fn new(root: impl Into<PathBuf>, policy: RetryPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run every entry whose output file is missing.
    ///
    /// A failed scenario is retried from scratch and the sweep never moves on
    /// until it has produced output. With a bounded policy, running out of
    /// attempts stops the sweep with [`Error::RetriesExhausted`].
    pub async fn run<R>(&self, entries: &[SweepEntry], runner: &mut R) -> Result<SweepReport>
    where
        R: ScenarioRunner + ?Sized,
    {
        let mut report = SweepReport::default();
        info!(scenarios = entries.len(), root = %self.root.display(), "Starting sweep");

        for entry in entries {
            let output = entry.output_path(&self.root);
            let scenario = format!("{}/{}", entry.run_dir, entry.id());
            if output.exists() {
                info!(scenario = %scenario, "skipping");
                report.skipped += 1;
                continue;
            }

            let mut attempt = 0;
            loop {
                attempt += 1;
                info!(scenario = %scenario, attempt, "running");

                let result = match runner.run(entry, &output).await {
                    Ok(()) if !output.exists() => Err(Error::measurement_failed(&scenario, Some(0))
                        .context(format!("no output written to {}", output.display()))),
                    other => other,
                };

                match result {
                    Ok(()) => {
                        info!(scenario = %scenario, attempt, "finished");
                        report.executed += 1;
                        break;
                    }
                    Err(e) => {
                        report.failed_attempts += 1;
                        warn!(scenario = %scenario, attempt, error = %e, "Scenario failed");
                        if !self.policy.allows_retry(attempt) {
                            return Err(Error::RetriesExhausted {
                                scenario,
                                attempts: attempt,
                            });
                        }
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        info!(
            executed = report.executed,
            skipped = report.skipped,
            failed_attempts = report.failed_attempts,
            "Sweep complete"
        );
        Ok(report)
    }
}
