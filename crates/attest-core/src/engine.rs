//! Engine trait for abstracting the protocol agent.
//!
//! The [`Engine`] trait decouples the interactive layer from a specific
//! credential exchange implementation. Production wires in a real agent; tests
//! and the demo binary use the in-memory simulation from `attest-harness`.

use std::future::Future;

use tokio::sync::broadcast;

use crate::{
    EngineError, EngineEvent,
    record::{
        ConnectionId, ConnectionRecord, CredentialId, CredentialOffer, CredentialRecord,
        CredentialSelection, Did, Invitation, OutOfBandId, ProofId, ProofRecord, ProofRequest,
        Registry,
    },
};

/// Long-lived credential/proof exchange agent.
///
/// All operations take `&self`: the engine is a shared handle that keeps
/// processing inbound protocol traffic while calls are in flight, and reports
/// every record transition on the [`subscribe`](Engine::subscribe) stream.
///
/// # Invariants
///
/// - Every record transition is broadcast exactly once, after the engine's
///   own state reflects it.
/// - Operations on unknown identifiers fail with
///   [`EngineError::RecordNotFound`] and leave state untouched.
pub trait Engine: Send + Sync {
    /// Subscribe to state-change events.
    ///
    /// Each receiver sees every event emitted after it was created.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;

    /// Resolve an invitation URL into a new connection.
    ///
    /// Returns `None` if the invitation carried no usable connection handle.
    fn receive_invitation(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<ConnectionRecord>, EngineError>> + Send;

    /// Wait until the connection has completed its DID exchange.
    fn await_connected(
        &self,
        id: &ConnectionId,
    ) -> impl Future<Output = Result<ConnectionRecord, EngineError>> + Send;

    /// Look up a connection by identifier.
    fn connection(
        &self,
        id: &ConnectionId,
    ) -> impl Future<Output = Result<ConnectionRecord, EngineError>> + Send;

    /// Create an out-of-band invitation for a remote peer.
    fn create_invitation(&self) -> impl Future<Output = Result<Invitation, EngineError>> + Send;

    /// Wait until a remote peer accepted the invitation and the resulting
    /// connection completed.
    fn await_invitation_accepted(
        &self,
        out_of_band_id: &OutOfBandId,
    ) -> impl Future<Output = Result<ConnectionRecord, EngineError>> + Send;

    /// All credential exchange records in the wallet.
    fn credentials(&self) -> impl Future<Output = Result<Vec<CredentialRecord>, EngineError>> + Send;

    /// Accept a received credential offer.
    fn accept_offer(
        &self,
        id: &CredentialId,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Decline a received credential offer.
    fn decline_offer(
        &self,
        id: &CredentialId,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Delete a credential exchange record.
    fn delete_credential(
        &self,
        id: &CredentialId,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Import an issuer DID from the given registry.
    fn import_did(&self, registry: Registry) -> impl Future<Output = Result<Did, EngineError>> + Send;

    /// Offer a credential over an established connection.
    fn offer_credential(
        &self,
        connection_id: &ConnectionId,
        offer: CredentialOffer,
    ) -> impl Future<Output = Result<CredentialRecord, EngineError>> + Send;

    /// Choose stored credentials that satisfy a received proof request.
    fn select_credentials(
        &self,
        id: &ProofId,
    ) -> impl Future<Output = Result<CredentialSelection, EngineError>> + Send;

    /// Accept a proof request, presenting the given selection.
    fn accept_request(
        &self,
        id: &ProofId,
        selection: CredentialSelection,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Decline a received proof request.
    fn decline_request(&self, id: &ProofId) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Send a proof request over an established connection.
    fn request_proof(
        &self,
        connection_id: &ConnectionId,
        request: ProofRequest,
    ) -> impl Future<Output = Result<ProofRecord, EngineError>> + Send;

    /// Send a plain-text message over an established connection.
    fn send_message(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Shut the engine down. Later calls fail with [`EngineError::Shutdown`].
    fn shutdown(&self) -> impl Future<Output = Result<(), EngineError>> + Send;
}
