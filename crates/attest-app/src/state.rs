//! Per-role session state owned by the agent facades.

use attest_core::{ConnectionId, Did, OutOfBandId};

/// Connection state shared by both roles.
///
/// # Invariants
///
/// - `connected` is true exactly when `active_connection_id` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    active_connection_id: Option<ConnectionId>,
}

impl SessionState {
    /// Fresh, unconnected state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a connection is active.
    pub fn is_connected(&self) -> bool {
        self.active_connection_id.is_some()
    }

    /// Active connection, if any.
    pub fn active_connection(&self) -> Option<&ConnectionId> {
        self.active_connection_id.as_ref()
    }

    /// Record a newly established connection.
    pub(crate) fn connect(&mut self, id: ConnectionId) {
        self.active_connection_id = Some(id);
    }

    /// Forget the connection if it is the active one.
    ///
    /// Returns true if the active connection was cleared.
    pub(crate) fn disconnect(&mut self, id: &ConnectionId) -> bool {
        if self.active_connection_id.as_ref() == Some(id) {
            self.active_connection_id = None;
            return true;
        }
        false
    }
}

/// Issuer/verifier state: the holder's session plus invitation and DID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuerState {
    /// Connection state.
    pub session: SessionState,
    /// Last invitation created.
    pub out_of_band_id: Option<OutOfBandId>,
    /// Issuer DID, once imported.
    pub did: Option<Did>,
}

impl IssuerState {
    /// Whether an invitation has been created.
    pub fn has_invitation(&self) -> bool {
        self.out_of_band_id.is_some()
    }
}
