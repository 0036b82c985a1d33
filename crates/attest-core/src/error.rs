//! Errors reported by the protocol engine.

use thiserror::Error;

/// Errors that can occur while calling into the protocol engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Invitation URL could not be parsed or resolved.
    #[error("invalid invitation: {reason}")]
    InvalidInvitation {
        /// Why the invitation was rejected
        reason: String,
    },

    /// No record with the given identifier exists.
    #[error("{kind} record not found: {id}")]
    RecordNotFound {
        /// Record family (connection, credential, proof)
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Operation is not valid for the record's current state.
    #[error("cannot {operation} in state {state}")]
    InvalidState {
        /// Operation that was attempted
        operation: &'static str,
        /// State the record was in
        state: String,
    },

    /// Remote peer or engine rejected the operation.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Engine has been shut down.
    #[error("engine is shut down")]
    Shutdown,

    /// Unexpected engine failure.
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns true if the error means the looked-up record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        let err = EngineError::RecordNotFound { kind: "credential", id: "c1".into() };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "credential record not found: c1");

        assert!(!EngineError::Shutdown.is_not_found());
        assert!(!EngineError::Rejected("nope".into()).is_not_found());
    }
}
