//! Holder facade: connect, receive, store and present credentials.

use attest_core::{
    ConnectionId, CredentialId, CredentialRecord, CredentialSelection, Engine, EngineError, ProofId,
};

use crate::{error::AgentError, state::SessionState};

/// Outcome of removing every stored credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    /// Credentials deleted.
    pub removed: usize,
    /// Credentials the engine refused to delete.
    pub failed: usize,
}

impl RemovalSummary {
    /// Whether there was anything to remove.
    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.failed == 0
    }
}

/// Sort credentials by last update, oldest first.
///
/// Records without an update time count as oldest. The sort is stable.
pub fn sort_by_update(credentials: &mut [CredentialRecord]) {
    credentials.sort_by_key(|c| c.updated_at.unwrap_or(0));
}

/// Holder-side operations.
#[derive(Debug)]
pub struct HolderAgent<E> {
    engine: E,
    name: String,
    state: SessionState,
}

impl<E: Engine> HolderAgent<E> {
    /// Wrap an engine under the given agent label.
    pub fn new(engine: E, name: impl Into<String>) -> Self {
        Self { engine, name: name.into(), state: SessionState::new() }
    }

    /// Agent label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Resolve an invitation URL and wait for the connection to complete.
    ///
    /// On success the connection becomes the active one.
    pub async fn accept_connection(&mut self, url: &str) -> Result<ConnectionId, AgentError> {
        let record = match self.engine.receive_invitation(url).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Err(AgentError::InvalidInvitation {
                    reason: "invitation carried no connection".to_string(),
                });
            },
            Err(EngineError::InvalidInvitation { reason }) => {
                return Err(AgentError::InvalidInvitation { reason });
            },
            Err(err) => return Err(AgentError::engine("receive invitation")(err)),
        };

        let record = self
            .engine
            .await_connected(&record.id)
            .await
            .map_err(AgentError::engine("wait for connection"))?;

        tracing::info!(connection = %record.id, peer = ?record.their_label, "connection established");
        self.state.connect(record.id.clone());
        Ok(record.id)
    }

    /// Forget a connection the engine abandoned.
    pub fn connection_lost(&mut self, id: &ConnectionId) -> bool {
        let cleared = self.state.disconnect(id);
        if cleared {
            tracing::info!(connection = %id, "active connection lost");
        }
        cleared
    }

    /// Accept a credential offer.
    pub async fn accept_credential_offer(&self, id: &CredentialId) -> Result<(), AgentError> {
        self.engine.accept_offer(id).await.map_err(AgentError::engine("accept credential offer"))
    }

    /// Decline a credential offer.
    pub async fn decline_credential_offer(&self, id: &CredentialId) -> Result<(), AgentError> {
        self.engine.decline_offer(id).await.map_err(AgentError::engine("decline credential offer"))
    }

    /// Credentials the wallet would present for a proof request.
    pub async fn requested_attributes(
        &self,
        id: &ProofId,
    ) -> Result<CredentialSelection, AgentError> {
        self.engine.select_credentials(id).await.map_err(AgentError::engine("select credentials"))
    }

    /// Accept a proof request, presenting the engine's own selection.
    pub async fn accept_proof_request(&self, id: &ProofId) -> Result<(), AgentError> {
        let selection = self.requested_attributes(id).await?;
        self.engine
            .accept_request(id, selection)
            .await
            .map_err(AgentError::engine("accept proof request"))
    }

    /// Decline a proof request.
    pub async fn decline_proof_request(&self, id: &ProofId) -> Result<(), AgentError> {
        self.engine.decline_request(id).await.map_err(AgentError::engine("decline proof request"))
    }

    /// Send a message over the active connection.
    ///
    /// # Errors
    ///
    /// - [`AgentError::NoActiveConnection`] if no connection is active.
    /// - [`AgentError::MissingConnectionRecord`] if the engine no longer knows
    ///   the active connection.
    pub async fn send_message(&self, content: &str) -> Result<(), AgentError> {
        send_over_active(&self.engine, &self.state, content).await
    }

    /// Every credential exchange record, oldest update first.
    ///
    /// Fail-soft: engine errors are logged and yield an empty list.
    pub async fn list_credentials(&self) -> Vec<CredentialRecord> {
        match self.engine.credentials().await {
            Ok(mut credentials) => {
                sort_by_update(&mut credentials);
                credentials
            },
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch credentials");
                Vec::new()
            },
        }
    }

    /// Delete one credential. Returns false if the engine refused.
    pub async fn remove_credential(&self, id: &CredentialId) -> bool {
        match self.engine.delete_credential(id).await {
            Ok(()) => {
                tracing::info!(credential = %id, "credential removed");
                true
            },
            Err(err) => {
                tracing::warn!(credential = %id, error = %err, "failed to remove credential");
                false
            },
        }
    }

    /// Delete every stored credential.
    pub async fn remove_all_credentials(&self) -> RemovalSummary {
        let mut summary = RemovalSummary::default();
        for credential in self.list_credentials().await {
            if self.remove_credential(&credential.id).await {
                summary.removed += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    /// Shut the engine down.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        self.engine.shutdown().await.map_err(AgentError::engine("shut down"))
    }
}

/// Send over the session's active connection after checking it still exists.
pub(crate) async fn send_over_active<E: Engine>(
    engine: &E,
    state: &SessionState,
    content: &str,
) -> Result<(), AgentError> {
    let id = state.active_connection().ok_or(AgentError::NoActiveConnection)?;
    let record = engine.connection(id).await.map_err(|err| {
        if err.is_not_found() {
            AgentError::MissingConnectionRecord
        } else {
            AgentError::engine("look up connection")(err)
        }
    })?;

    engine.send_message(&record.id, content).await.map_err(AgentError::engine("send message"))?;
    tracing::debug!(connection = %record.id, "message sent");
    Ok(())
}
