//! Classified result of one program invocation

use std::fmt;
use std::time::Duration;

use super::FailureKind;

/// Outcome of running the target program once
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Exited with status zero before the deadline; carries captured stdout
    Success(Vec<u8>),
    /// Killed after running past the deadline
    TimedOut(Duration),
    /// Could not be started, or exited with an error status
    RuntimeError(RuntimeFailure),
}

/// Error side of an invocation that ran (or tried to run) without timing out
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeFailure {
    pub started: bool,
    pub message: String,
}

impl ExecutionOutcome {
    /// Failure to spawn the process at all
    pub fn startup_error(message: impl Into<String>) -> Self {
        ExecutionOutcome::RuntimeError(RuntimeFailure {
            started: false,
            message: message.into(),
        })
    }

    /// Process ran and exited with an error status
    pub fn runtime_error(message: impl Into<String>) -> Self {
        ExecutionOutcome::RuntimeError(RuntimeFailure {
            started: true,
            message: message.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }

    /// Failure classification for non-success outcomes
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ExecutionOutcome::Success(_) => None,
            ExecutionOutcome::TimedOut(_) => Some(FailureKind::Timeout),
            ExecutionOutcome::RuntimeError(f) if !f.started => Some(FailureKind::Startup),
            ExecutionOutcome::RuntimeError(_) => Some(FailureKind::Runtime),
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Success(out) => write!(f, "{}", String::from_utf8_lossy(out)),
            ExecutionOutcome::TimedOut(limit) => write!(
                f,
                "program took more than {:.2} seconds to execute",
                limit.as_secs_f64()
            ),
            ExecutionOutcome::RuntimeError(failure) => write!(f, "{}", failure.message),
        }
    }
}
