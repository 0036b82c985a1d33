//! State-change notifications pushed by the protocol engine.
//!
//! The engine emits one [`EngineEvent`] per record transition, on its own
//! schedule. Consumers subscribe by [`EventKind`] and filter on the record's
//! state tag.

use crate::record::{
    BasicMessage, ConnectionRecord, ConnectionState, CredentialRecord, CredentialState,
    ProofRecord, ProofState,
};

/// Discriminant of an [`EngineEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Connection state changed.
    ConnectionStateChanged,
    /// Credential exchange state changed.
    CredentialStateChanged,
    /// Proof exchange state changed.
    ProofStateChanged,
    /// Basic message sent or received.
    BasicMessageStateChanged,
}

/// Events emitted by the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Connection moved to a new state.
    ConnectionStateChanged {
        /// Connection after the transition.
        record: ConnectionRecord,
        /// State before the transition. `None` for new records.
        previous: Option<ConnectionState>,
    },

    /// Credential exchange moved to a new state.
    CredentialStateChanged {
        /// Credential exchange after the transition.
        record: CredentialRecord,
        /// State before the transition. `None` for new records.
        previous: Option<CredentialState>,
    },

    /// Proof exchange moved to a new state.
    ProofStateChanged {
        /// Proof exchange after the transition.
        record: ProofRecord,
        /// State before the transition. `None` for new records.
        previous: Option<ProofState>,
    },

    /// Basic message sent or received.
    BasicMessageStateChanged {
        /// The message.
        message: BasicMessage,
    },
}

impl EngineEvent {
    /// Subscription key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ConnectionStateChanged { .. } => EventKind::ConnectionStateChanged,
            Self::CredentialStateChanged { .. } => EventKind::CredentialStateChanged,
            Self::ProofStateChanged { .. } => EventKind::ProofStateChanged,
            Self::BasicMessageStateChanged { .. } => EventKind::BasicMessageStateChanged,
        }
    }

    /// Credential record carried by this event, if any.
    pub fn credential(&self) -> Option<&CredentialRecord> {
        match self {
            Self::CredentialStateChanged { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Proof record carried by this event, if any.
    pub fn proof(&self) -> Option<&ProofRecord> {
        match self {
            Self::ProofStateChanged { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Basic message carried by this event, if any.
    pub fn message(&self) -> Option<&BasicMessage> {
        match self {
            Self::BasicMessageStateChanged { message } => Some(message),
            _ => None,
        }
    }
}
