//! Engine error types.
//!
//! Every public engine operation absorbs these into a safe default. The
//! `try_*` variants surface them for callers that report failures, such as
//! the HTTP API.

use tally_state::StateError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unrecognized metric name: {0:?}")]
    UnknownMetric(String),

    #[error("metric delta must be non-negative, got {0}")]
    NegativeDelta(i64),

    /// Store I/O failure, blocking-task failure, or an elapsed deadline.
    #[error("metric store unavailable: {0}")]
    StoreUnavailable(String),
}

impl EngineError {
    /// Rejected input, as opposed to a store failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::UnknownMetric(_) | EngineError::NegativeDelta(_))
    }
}

impl From<StateError> for EngineError {
    fn from(value: StateError) -> Self {
        Self::StoreUnavailable(value.to_string())
    }
}
