//! Error types for the dukecounter pipeline.
//!
//! Configuration problems and external-tool failures are fatal to the whole
//! run. Unconvertible parameter values are never errors; they are stored as
//! strings by the loader.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for dukecounter operations.
#[derive(Debug, Error)]
pub enum DukeCounterError {
    /// An enumerated option had an unsupported value.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// An external tool failed during a stage.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// A static template body could not be read.
    #[error("Failed to read template {}: {source}", path.display())]
    Template {
        /// The template path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DukeCounterError {
    /// Wraps an IO error with the path it occurred on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps a template read failure.
    #[must_use]
    pub fn template(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Template {
            path: path.into(),
            source,
        }
    }

    /// Returns the stage error, if this is one.
    #[must_use]
    pub fn as_stage(&self) -> Option<&StageError> {
        match self {
            Self::Stage(err) => Some(err),
            _ => None,
        }
    }
}

/// Raised when an enumerated option holds a value outside its allowed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Set {key}: {expected} (got '{value}')")]
pub struct ConfigError {
    /// The parameter key.
    pub key: String,
    /// The rejected value.
    pub value: String,
    /// The allowed values, e.g. `yes/no`.
    pub expected: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn invalid_option(
        key: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// How an external tool failed.
#[derive(Debug, Error)]
pub enum StageFailure {
    /// The subprocess could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// The program that was launched.
        program: String,
        /// The spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The subprocess exited unsuccessfully.
    #[error("{program} exited with {}", describe_code(*code))]
    ExitStatus {
        /// The program that ran.
        program: String,
        /// The exit code, `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// The subprocess produced no output for too long and was killed.
    #[error("{program} timed out after {idle:?} without output")]
    IdleTimeout {
        /// The program that ran.
        program: String,
        /// The idle limit that fired.
        idle: Duration,
    },

    /// Waiting on or reading from the subprocess failed.
    #[error("lost contact with {program}: {source}")]
    Wait {
        /// The program that ran.
        program: String,
        /// The IO error.
        #[source]
        source: std::io::Error,
    },
}

fn describe_code(code: Option<i32>) -> String {
    code.map_or_else(
        || "no exit code (terminated by signal)".to_string(),
        |c| format!("exit code {c}"),
    )
}

/// Raised when an external tool fails during a named stage.
#[derive(Debug, Error)]
#[error("{stage} run failed: {failure}")]
pub struct StageError {
    /// The stage that failed, e.g. `Module 2`.
    pub stage: String,
    /// What went wrong.
    #[source]
    pub failure: StageFailure,
}

impl StageError {
    /// Creates a new stage error.
    #[must_use]
    pub fn new(stage: impl Into<String>, failure: StageFailure) -> Self {
        Self {
            stage: stage.into(),
            failure,
        }
    }

    /// Returns true if the stage was killed by the idle timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.failure, StageFailure::IdleTimeout { .. })
    }
}

/// Result alias used across the crate.
pub type Result<T, E = DukeCounterError> = std::result::Result<T, E>;
