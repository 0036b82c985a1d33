//! Errors reported by the agent facades.

use attest_core::EngineError;
use thiserror::Error;

/// Why an agent operation could not complete.
///
/// Menu drivers render every variant as a failure line and return to the
/// menu; none of them end the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Invitation URL was rejected or yielded no connection.
    #[error("invalid invitation: {reason}")]
    InvalidInvitation {
        /// Why the invitation was rejected
        reason: String,
    },

    /// Operation needs a connection but none is active.
    #[error("no active connection")]
    NoActiveConnection,

    /// Active connection id no longer resolves to a record.
    #[error("connection record is missing")]
    MissingConnectionRecord,

    /// Engine call failed.
    #[error("{operation} failed: {source}")]
    EngineOperationFailed {
        /// Operation that was attempted
        operation: &'static str,
        /// Underlying engine error
        source: EngineError,
    },
}

impl AgentError {
    /// Wrap an engine error for the named operation.
    ///
    /// Shaped for `map_err`: `engine.call().await.map_err(AgentError::engine("call"))`.
    pub fn engine(operation: &'static str) -> impl FnOnce(EngineError) -> Self {
        move |source| Self::EngineOperationFailed { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_failure_names_operation() {
        let err = AgentError::engine("send message")(EngineError::Shutdown);
        assert_eq!(err.to_string(), "send message failed: engine is shut down");
        assert!(std::error::Error::source(&err).is_some());
    }
}
