//! Error types for the onionsweep orchestrator.
//!
//! Every failure that can happen while driving a sweep maps onto one variant
//! of [`Error`]. The variants fall into two families that are handled very
//! differently by the callers:
//!
//! - startup failures ([`Error::StartupTimeout`], [`Error::ProcessExited`])
//!   are recovered inside the run driver by re-acquiring the daemons;
//! - everything else aborts the current attempt and is handed to the sweep
//!   supervisor, which retries the whole scenario from scratch.
//!
//! ```rust
//! use onionsweep_common::{Error, Result, ResultExt};
//!
//! fn launch() -> Result<()> {
//!     Err(Error::process_exited("tor-0", Some(1)))
//! }
//!
//! fn acquire() -> Result<()> {
//!     launch().context("acquiring deaddrop daemons")
//! }
//!
//! assert!(acquire().unwrap_err().is_startup_failure());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for onionsweep operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for onionsweep operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A daemon did not print its readiness marker within the bound.
    #[error("Startup timeout: {instance} not ready after {timeout:?}")]
    StartupTimeout { instance: String, timeout: Duration },

    /// A daemon's output ended before it printed its readiness marker.
    #[error("Process exited during startup: {instance} (exit code {exit_code:?})")]
    ProcessExited {
        instance: String,
        exit_code: Option<i32>,
    },

    /// The measurement process ran past its wall-clock bound.
    #[error("Execution of {scenario} exceeded {timeout:?} and will restart")]
    MeasurementTimeout { scenario: String, timeout: Duration },

    /// The measurement process exited with a non-zero status.
    #[error("Measurement failed: {scenario} (exit code {exit_code:?})")]
    MeasurementFailed {
        scenario: String,
        exit_code: Option<i32>,
    },

    /// A contention trace record could not be interpreted.
    #[error("Parse error at line {line_number}: {reason}: {line}")]
    Parse {
        line_number: usize,
        line: String,
        reason: String,
    },

    /// A process could not be started at all.
    #[error("Spawn failed: {program} - {reason}")]
    Spawn { program: String, reason: String },

    /// The service directory scan found an unusable layout.
    #[error("Discovery failed in {}: {reason}", .path.display())]
    Discovery { path: PathBuf, reason: String },

    /// Cluster host discovery failed.
    #[error("Cluster error: {0}")]
    Cluster(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The retry policy ran out of attempts for a scenario.
    #[error("Retries exhausted for {scenario} after {attempts} attempts")]
    RetriesExhausted { scenario: String, attempts: u32 },

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        source: Box<Error>,
    },
}

impl Error {
    pub fn startup_timeout(instance: impl Into<String>, timeout: Duration) -> Self {
        Self::StartupTimeout {
            instance: instance.into(),
            timeout,
        }
    }

    pub fn process_exited(instance: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ProcessExited {
            instance: instance.into(),
            exit_code,
        }
    }

    pub fn measurement_timeout(scenario: impl Into<String>, timeout: Duration) -> Self {
        Self::MeasurementTimeout {
            scenario: scenario.into(),
            timeout,
        }
    }

    pub fn measurement_failed(scenario: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::MeasurementFailed {
            scenario: scenario.into(),
            exit_code,
        }
    }

    pub fn parse(line_number: usize, line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            line_number,
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub fn spawn(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn discovery(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Discovery {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn cluster(message: impl Into<String>) -> Self {
        Self::Cluster(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Adds context to an error.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::WithContext {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through any context layers.
    pub fn root(&self) -> &Error {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for daemon acquisition failures, which are retried in place.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self.root(),
            Self::StartupTimeout { .. } | Self::ProcessExited { .. }
        )
    }

    /// True when the measurement process itself failed or overran.
    pub fn is_measurement_failure(&self) -> bool {
        matches!(
            self.root(),
            Self::MeasurementTimeout { .. } | Self::MeasurementFailed { .. }
        )
    }
}

// Convenience methods for Result types
pub trait ResultExt<T> {
    /// Adds context to an error result.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}
