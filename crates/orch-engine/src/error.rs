use std::fmt;

use orch_types::{run::Station, CoderunnerError};

/// Raised when a station is still waiting on an external job, or when the
/// adapter reports a retryable transport/configuration problem. Callers
/// must retry the queue message; the run and station both stay `running`.
#[derive(Debug)]
pub struct RetryableStationExecutionError {
    pub station: Station,
    pub reason: String,
}

impl fmt::Display for RetryableStationExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "station {} is retryable: {}", self.station.as_str(), self.reason)
    }
}

impl std::error::Error for RetryableStationExecutionError {}

/// Raised when a station adapter returns a terminal non-success outcome, or
/// a non-retryable internal error occurs while executing a station. Drives
/// `handleTerminalRunFailure`: CAS the run to `failed`.
#[derive(Debug)]
pub struct StationTerminalFailureError {
    pub station: Station,
    pub reason: String,
}

impl fmt::Display for StationTerminalFailureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "station {} failed terminally: {}", self.station.as_str(), self.reason)
    }
}

impl std::error::Error for StationTerminalFailureError {}

/// The two ways `executeStation` can fail. Any other error surfacing from
/// store I/O is folded into `Terminal` by the caller.
#[derive(Debug)]
pub enum StationError {
    Retryable(RetryableStationExecutionError),
    Terminal(StationTerminalFailureError),
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationError::Retryable(e) => e.fmt(f),
            StationError::Terminal(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for StationError {}

impl StationError {
    pub fn retryable(station: Station, reason: impl Into<String>) -> Self {
        StationError::Retryable(RetryableStationExecutionError {
            station,
            reason: reason.into(),
        })
    }

    pub fn terminal(station: Station, reason: impl Into<String>) -> Self {
        StationError::Terminal(StationTerminalFailureError {
            station,
            reason: reason.into(),
        })
    }

    /// Classifies a failed adapter call using its `retryable` flag.
    pub fn from_coderunner_error(station: Station, err: CoderunnerError) -> Self {
        if err.is_retryable() {
            StationError::retryable(station, err.message)
        } else {
            StationError::terminal(station, err.message)
        }
    }
}
