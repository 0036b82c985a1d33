//! Issuer/verifier facade: invite, issue credentials and request proofs.

use attest_core::{ConnectionId, CredentialRecord, Did, Engine, Invitation, ProofRecord, Registry};

use super::holder::send_over_active;
use crate::{config::AgentConfig, error::AgentError, state::IssuerState};

/// Issuer-side operations.
#[derive(Debug)]
pub struct IssuerAgent<E> {
    engine: E,
    config: AgentConfig,
    state: IssuerState,
}

impl<E: Engine> IssuerAgent<E> {
    /// Wrap an engine with the given configuration.
    pub fn new(engine: E, config: AgentConfig) -> Self {
        Self { engine, config, state: IssuerState::default() }
    }

    /// Agent label.
    pub fn name(&self) -> &str {
        &self.config.label
    }

    /// Underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Issuer state.
    pub fn state(&self) -> &IssuerState {
        &self.state
    }

    /// Create an invitation and remember its out-of-band id.
    pub async fn create_invitation(&mut self) -> Result<Invitation, AgentError> {
        let invitation = self
            .engine
            .create_invitation()
            .await
            .map_err(AgentError::engine("create invitation"))?;
        tracing::info!(out_of_band = %invitation.out_of_band_id, "invitation created");
        self.state.out_of_band_id = Some(invitation.out_of_band_id.clone());
        Ok(invitation)
    }

    /// Wait for the last invitation to be accepted.
    ///
    /// # Errors
    ///
    /// [`AgentError::MissingConnectionRecord`] if no invitation was created.
    pub async fn await_connection(&mut self) -> Result<ConnectionId, AgentError> {
        let out_of_band_id =
            self.state.out_of_band_id.clone().ok_or(AgentError::MissingConnectionRecord)?;
        let record = self
            .engine
            .await_invitation_accepted(&out_of_band_id)
            .await
            .map_err(AgentError::engine("wait for connection"))?;

        tracing::info!(connection = %record.id, peer = ?record.their_label, "connection established");
        self.state.session.connect(record.id.clone());
        Ok(record.id)
    }

    /// Forget a connection the engine abandoned.
    pub fn connection_lost(&mut self, id: &ConnectionId) -> bool {
        let cleared = self.state.session.disconnect(id);
        if cleared {
            tracing::info!(connection = %id, "active connection lost");
        }
        cleared
    }

    /// Import the issuer DID from a registry.
    pub async fn import_did(&mut self, registry: Registry) -> Result<Did, AgentError> {
        let did = self.engine.import_did(registry).await.map_err(AgentError::engine("import DID"))?;
        tracing::info!(%registry, %did, "issuer DID imported");
        self.state.did = Some(did.clone());
        Ok(did)
    }

    /// Offer the configured credential over the active connection.
    pub async fn offer_credential(&self) -> Result<CredentialRecord, AgentError> {
        let connection = self.active_connection()?;
        let record = self
            .engine
            .offer_credential(connection, self.config.credential.clone())
            .await
            .map_err(AgentError::engine("offer credential"))?;
        tracing::info!(credential = %record.id, "credential offered");
        Ok(record)
    }

    /// Request the configured proof over the active connection.
    pub async fn request_proof(&self) -> Result<ProofRecord, AgentError> {
        let connection = self.active_connection()?;
        let record = self
            .engine
            .request_proof(connection, self.config.proof.clone())
            .await
            .map_err(AgentError::engine("request proof"))?;
        tracing::info!(proof = %record.id, "proof requested");
        Ok(record)
    }

    /// Send a message over the active connection.
    pub async fn send_message(&self, content: &str) -> Result<(), AgentError> {
        send_over_active(&self.engine, &self.state.session, content).await
    }

    /// Shut the engine down.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        self.engine.shutdown().await.map_err(AgentError::engine("shut down"))
    }

    fn active_connection(&self) -> Result<&ConnectionId, AgentError> {
        self.state.session.active_connection().ok_or(AgentError::NoActiveConnection)
    }
}
