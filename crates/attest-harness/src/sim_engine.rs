//! In-memory protocol engine.
//!
//! [`SimEngine`] implements [`Engine`] over plain records so the interactive
//! layer can be driven without a wallet, ledger or network. Cloning yields
//! another handle to the same state: tests keep one handle to inject remote
//! activity (offers, proof requests, messages) and inspect what the session
//! did, while the session owns another.
//!
//! An optional [`Counterparty`] plays the remote peer with a fixed latency,
//! which is what the demo binary runs against.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use attest_core::{
    Attribute, BasicMessage, ConnectionId, ConnectionRecord, ConnectionState, CredentialId,
    CredentialOffer, CredentialRecord, CredentialSelection, CredentialState, Did, Engine,
    EngineError, EngineEvent, Invitation, MessageId, MessageRole, OutOfBandId, ProofId,
    ProofRecord, ProofRequest, ProofState, Registry, SelectedAttribute,
};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::broadcast::{self, error::RecvError};
use url::Url;

/// Broadcast buffer for engine events.
const EVENT_CAPACITY: usize = 256;

/// Logical clock origin (unix millis).
const CLOCK_ORIGIN: u64 = 1_700_000_000_000;

/// Base URL of invitations created by the simulation.
pub const INVITATION_BASE: &str = "https://attest.invalid/invite";

/// Failure mode that stays active until healed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `receive_invitation` resolves but yields no connection.
    EmptyInvitation,
    /// `connection` reports every record as missing.
    ConnectionRecordMissing,
    /// `credentials` and `select_credentials` fail.
    WalletUnavailable,
    /// `delete_credential` is rejected.
    DeleteRejected,
    /// `import_did` is rejected.
    DidImportRejected,
    /// `send_message` is rejected.
    SendRejected,
}

/// Engine call recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `receive_invitation`
    ReceiveInvitation(String),
    /// `create_invitation`
    CreateInvitation,
    /// `accept_offer`
    AcceptOffer(CredentialId),
    /// `decline_offer`
    DeclineOffer(CredentialId),
    /// `delete_credential`
    DeleteCredential(CredentialId),
    /// `import_did`
    ImportDid(Registry),
    /// `offer_credential`
    OfferCredential(ConnectionId),
    /// `accept_request`
    AcceptRequest(ProofId),
    /// `decline_request`
    DeclineRequest(ProofId),
    /// `request_proof`
    RequestProof(ConnectionId),
    /// `send_message`
    SendMessage {
        /// Target connection
        connection: ConnectionId,
        /// Message text
        content: String,
    },
    /// `shutdown`
    Shutdown,
}

/// Simulated remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterparty {
    /// Label the peer announces on connection.
    pub label: String,
    /// Delay before each peer reaction.
    pub latency: Duration,
    /// Whether presentations the peer sends verify.
    pub verify_proofs: bool,
    /// Whether the peer answers every message.
    pub echo_messages: bool,
    /// Credential the peer offers once a holder connects.
    pub offer_on_connect: Option<CredentialOffer>,
    /// Proof the peer requests once the holder stored a credential.
    pub request_after_issue: Option<ProofRequest>,
}

impl Counterparty {
    /// Passive peer that accepts invitations, offers and proof requests.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            latency: Duration::ZERO,
            verify_proofs: true,
            echo_messages: false,
            offer_on_connect: None,
            request_after_issue: None,
        }
    }

    /// Peer that issues `offer` after connecting and then asks for `request`.
    pub fn issuer(label: impl Into<String>, offer: CredentialOffer, request: ProofRequest) -> Self {
        Self { offer_on_connect: Some(offer), request_after_issue: Some(request), ..Self::new(label) }
    }

    /// Set the reaction delay.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer every message.
    #[must_use]
    pub fn echoing(mut self) -> Self {
        self.echo_messages = true;
        self
    }

    /// Make presentations fail verification.
    #[must_use]
    pub fn unverifiable(mut self) -> Self {
        self.verify_proofs = false;
        self
    }
}

#[derive(Debug)]
struct SimState {
    tx: broadcast::Sender<EngineEvent>,
    rng: ChaCha8Rng,
    clock: u64,
    shut_down: bool,
    faults: HashSet<Fault>,
    calls: Vec<Call>,
    invitations: Vec<OutOfBandId>,
    connections: Vec<ConnectionRecord>,
    credentials: Vec<CredentialRecord>,
    proofs: Vec<ProofRecord>,
    messages: Vec<BasicMessage>,
    did: Option<Did>,
}

impl SimState {
    fn new(seed: u64) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tx,
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock: 0,
            shut_down: false,
            faults: HashSet::new(),
            calls: Vec::new(),
            invitations: Vec::new(),
            connections: Vec::new(),
            credentials: Vec::new(),
            proofs: Vec::new(),
            messages: Vec::new(),
            did: None,
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        format!("{prefix}-{:08x}", self.rng.next_u32())
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        CLOCK_ORIGIN + self.clock
    }

    fn emit(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("no event subscribers");
        }
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.shut_down { Err(EngineError::Shutdown) } else { Ok(()) }
    }

    fn has_fault(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn connection(&self, id: &ConnectionId) -> Result<&ConnectionRecord, EngineError> {
        self.connections
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found("connection", id.as_str()))
    }

    fn ready_connection(&self, id: &ConnectionId) -> Result<&ConnectionRecord, EngineError> {
        let record = self.connection(id)?;
        if record.is_ready() {
            Ok(record)
        } else {
            Err(EngineError::InvalidState {
                operation: "use connection",
                state: format!("{:?}", record.state),
            })
        }
    }

    fn latest_connection(&self) -> Option<ConnectionId> {
        self.connections.iter().rev().find(|c| c.is_ready()).map(|c| c.id.clone())
    }

    fn credential(&self, id: &CredentialId) -> Result<&CredentialRecord, EngineError> {
        self.credentials
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found("credential", id.as_str()))
    }

    fn proof(&self, id: &ProofId) -> Result<&ProofRecord, EngineError> {
        self.proofs.iter().find(|p| &p.id == id).ok_or_else(|| not_found("proof", id.as_str()))
    }

    fn insert_connection(
        &mut self,
        state: ConnectionState,
        out_of_band_id: Option<OutOfBandId>,
        their_label: Option<String>,
    ) -> ConnectionRecord {
        let record = ConnectionRecord {
            id: ConnectionId::new(self.next_id("conn")),
            state,
            out_of_band_id,
            their_label,
        };
        self.connections.push(record.clone());
        self.emit(EngineEvent::ConnectionStateChanged { record: record.clone(), previous: None });
        record
    }

    fn set_connection_state(
        &mut self,
        id: &ConnectionId,
        state: ConnectionState,
    ) -> Result<ConnectionRecord, EngineError> {
        let record = self
            .connections
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found("connection", id.as_str()))?;
        let previous = std::mem::replace(&mut record.state, state);
        let record = record.clone();
        self.emit(EngineEvent::ConnectionStateChanged {
            record: record.clone(),
            previous: Some(previous),
        });
        Ok(record)
    }

    fn insert_credential(
        &mut self,
        connection_id: Option<ConnectionId>,
        state: CredentialState,
        attributes: Vec<Attribute>,
        updated_at: Option<u64>,
    ) -> CredentialRecord {
        let record = CredentialRecord {
            id: CredentialId::new(self.next_id("cred")),
            connection_id,
            state,
            attributes,
            created_at: self.tick(),
            updated_at,
        };
        self.credentials.push(record.clone());
        self.emit(EngineEvent::CredentialStateChanged { record: record.clone(), previous: None });
        record
    }

    fn set_credential_state(
        &mut self,
        id: &CredentialId,
        state: CredentialState,
    ) -> Result<CredentialRecord, EngineError> {
        let now = self.tick();
        let record = self
            .credentials
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found("credential", id.as_str()))?;
        let previous = std::mem::replace(&mut record.state, state);
        record.updated_at = Some(now);
        let record = record.clone();
        self.emit(EngineEvent::CredentialStateChanged {
            record: record.clone(),
            previous: Some(previous),
        });
        Ok(record)
    }

    fn insert_proof(
        &mut self,
        connection_id: Option<ConnectionId>,
        state: ProofState,
        requested: Vec<String>,
    ) -> ProofRecord {
        let record = ProofRecord {
            id: ProofId::new(self.next_id("proof")),
            connection_id,
            state,
            requested,
            is_verified: None,
        };
        self.proofs.push(record.clone());
        self.emit(EngineEvent::ProofStateChanged { record: record.clone(), previous: None });
        record
    }

    fn set_proof_state(
        &mut self,
        id: &ProofId,
        state: ProofState,
        is_verified: Option<bool>,
    ) -> Result<ProofRecord, EngineError> {
        let record = self
            .proofs
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| not_found("proof", id.as_str()))?;
        let previous = std::mem::replace(&mut record.state, state);
        if is_verified.is_some() {
            record.is_verified = is_verified;
        }
        let record = record.clone();
        self.emit(EngineEvent::ProofStateChanged {
            record: record.clone(),
            previous: Some(previous),
        });
        Ok(record)
    }

    fn insert_message(
        &mut self,
        connection_id: ConnectionId,
        role: MessageRole,
        content: String,
    ) -> BasicMessage {
        let message = BasicMessage {
            id: MessageId::new(self.next_id("msg")),
            connection_id,
            role,
            content,
            sent_time: self.tick(),
        };
        self.messages.push(message.clone());
        self.emit(EngineEvent::BasicMessageStateChanged { message: message.clone() });
        message
    }

    fn accepted_connection(&self, out_of_band_id: &OutOfBandId) -> Option<ConnectionRecord> {
        self.connections
            .iter()
            .find(|c| c.out_of_band_id.as_ref() == Some(out_of_band_id) && c.is_ready())
            .cloned()
    }

    fn accept_invitation(
        &mut self,
        out_of_band_id: &OutOfBandId,
        label: String,
    ) -> Option<ConnectionRecord> {
        if let Some(existing) = self.accepted_connection(out_of_band_id) {
            return Some(existing);
        }
        if !self.invitations.contains(out_of_band_id) {
            return None;
        }
        let record = self.insert_connection(
            ConnectionState::RequestReceived,
            Some(out_of_band_id.clone()),
            Some(label),
        );
        self.set_connection_state(&record.id, ConnectionState::ResponseSent).ok()?;
        self.set_connection_state(&record.id, ConnectionState::Completed).ok()
    }

    /// Stored value for an attribute, from the most recently updated credential.
    fn stored_value(&self, name: &str) -> Option<(CredentialId, String)> {
        self.credentials
            .iter()
            .filter(|c| c.state == CredentialState::Done)
            .filter_map(|c| {
                let attribute = c.attributes.iter().find(|a| a.name == name)?;
                Some((c.updated_at.unwrap_or(0), c.id.clone(), attribute.value.clone()))
            })
            .max_by_key(|(updated_at, ..)| *updated_at)
            .map(|(_, id, value)| (id, value))
    }
}

fn not_found(kind: &'static str, id: &str) -> EngineError {
    EngineError::RecordNotFound { kind, id: id.to_string() }
}

fn invalid_state(operation: &'static str, state: impl std::fmt::Debug) -> EngineError {
    EngineError::InvalidState { operation, state: format!("{state:?}") }
}

/// Extract the out-of-band id from an invitation URL.
///
/// # Errors
///
/// [`EngineError::InvalidInvitation`] if the URL does not parse or carries no
/// non-empty `oob` query parameter.
pub fn parse_invitation(url: &str) -> Result<OutOfBandId, EngineError> {
    let parsed = Url::parse(url)
        .map_err(|err| EngineError::InvalidInvitation { reason: err.to_string() })?;
    parsed
        .query_pairs()
        .find(|(key, value)| key == "oob" && !value.is_empty())
        .map(|(_, value)| OutOfBandId::new(value.into_owned()))
        .ok_or_else(|| EngineError::InvalidInvitation {
            reason: "missing oob parameter".to_string(),
        })
}

/// Invitation URL for the given out-of-band id.
pub fn invitation_url(out_of_band_id: &OutOfBandId) -> String {
    format!("{INVITATION_BASE}?oob={out_of_band_id}")
}

/// Cloneable handle to a simulated engine.
#[derive(Debug, Clone)]
pub struct SimEngine {
    state: Arc<Mutex<SimState>>,
    counterparty: Option<Arc<Counterparty>>,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEngine {
    /// Create an engine with seed 0 and no counterparty.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create an engine whose record ids derive from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self { state: Arc::new(Mutex::new(SimState::new(seed))), counterparty: None }
    }

    /// Let a simulated peer react to outbound activity.
    #[must_use]
    pub fn with_counterparty(mut self, counterparty: Counterparty) -> Self {
        self.counterparty = Some(Arc::new(counterparty));
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Activate a fault.
    pub fn fail(&self, fault: Fault) {
        self.lock().faults.insert(fault);
    }

    /// Deactivate a fault.
    pub fn heal(&self, fault: Fault) {
        self.lock().faults.remove(&fault);
    }

    /// Journal of engine calls so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Contents of messages we sent, oldest first.
    pub fn sent_messages(&self) -> Vec<String> {
        self.lock()
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::Sender)
            .map(|m| m.content.clone())
            .collect()
    }

    /// Every connection record, oldest first.
    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.lock().connections.clone()
    }

    /// Credential record by id.
    pub fn credential(&self, id: &CredentialId) -> Option<CredentialRecord> {
        self.lock().credential(id).ok().cloned()
    }

    /// Every credential exchange record.
    pub fn credential_records(&self) -> Vec<CredentialRecord> {
        self.lock().credentials.clone()
    }

    /// Proof record by id.
    pub fn proof(&self, id: &ProofId) -> Option<ProofRecord> {
        self.lock().proof(id).ok().cloned()
    }

    /// Whether `shutdown` was called.
    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    /// Remote peer accepts the most recent invitation.
    ///
    /// Returns `None` if no invitation was created.
    pub fn connect_peer(&self, label: impl Into<String>) -> Option<ConnectionId> {
        let mut state = self.lock();
        let out_of_band_id = state.invitations.last()?.clone();
        state.accept_invitation(&out_of_band_id, label.into()).map(|c| c.id)
    }

    /// Remote issuer offers a credential over the latest connection.
    pub fn offer(&self, attributes: Vec<Attribute>) -> CredentialId {
        let mut state = self.lock();
        let connection = state.latest_connection();
        state.insert_credential(connection, CredentialState::OfferReceived, attributes, None).id
    }

    /// Remote verifier requests a proof over the latest connection.
    pub fn receive_proof_request(&self, attributes: &[&str]) -> ProofId {
        let mut state = self.lock();
        let connection = state.latest_connection();
        let requested = attributes.iter().map(ToString::to_string).collect();
        state.insert_proof(connection, ProofState::RequestReceived, requested).id
    }

    /// Remote peer sends a message over the latest connection.
    pub fn deliver_message(&self, content: impl Into<String>) -> MessageId {
        let mut state = self.lock();
        let connection =
            state.latest_connection().unwrap_or_else(|| ConnectionId::new("detached"));
        state.insert_message(connection, MessageRole::Receiver, content.into()).id
    }

    /// Put a finished credential straight into the wallet.
    pub fn store_credential(&self, attributes: Vec<Attribute>, updated_at: Option<u64>) -> CredentialId {
        let mut state = self.lock();
        state.insert_credential(None, CredentialState::Done, attributes, updated_at).id
    }

    /// Engine abandons a connection.
    pub fn abandon_connection(&self, id: &ConnectionId) -> bool {
        self.lock().set_connection_state(id, ConnectionState::Abandoned).is_ok()
    }

    /// Run `reaction` after the counterparty's latency, if there is one.
    fn later(&self, reaction: impl FnOnce(&Self, &Counterparty) + Send + 'static) {
        let Some(counterparty) = self.counterparty.clone() else {
            return;
        };
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(counterparty.latency).await;
            if engine.is_shut_down() {
                return;
            }
            reaction(&engine, &counterparty);
        });
    }

    fn latency(&self) -> Duration {
        self.counterparty.as_ref().map_or(Duration::ZERO, |c| c.latency)
    }
}

impl Engine for SimEngine {
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.lock().tx.subscribe()
    }

    async fn receive_invitation(&self, url: &str) -> Result<Option<ConnectionRecord>, EngineError> {
        let mut state = self.lock();
        state.ensure_running()?;
        state.calls.push(Call::ReceiveInvitation(url.to_string()));

        let out_of_band_id = parse_invitation(url)?;
        if state.has_fault(Fault::EmptyInvitation) {
            return Ok(None);
        }
        let label = self.counterparty.as_ref().map(|c| c.label.clone());
        Ok(Some(state.insert_connection(
            ConnectionState::InvitationReceived,
            Some(out_of_band_id),
            label,
        )))
    }

    async fn await_connected(&self, id: &ConnectionId) -> Result<ConnectionRecord, EngineError> {
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let record = {
            let mut state = self.lock();
            state.ensure_running()?;
            let current = state.connection(id)?.clone();
            if current.is_ready() {
                current
            } else {
                state.set_connection_state(id, ConnectionState::RequestSent)?;
                state.set_connection_state(id, ConnectionState::Completed)?
            }
        };

        self.later(|engine, counterparty| {
            if let Some(offer) = &counterparty.offer_on_connect {
                engine.offer(offer.attributes.clone());
            }
        });
        Ok(record)
    }

    async fn connection(&self, id: &ConnectionId) -> Result<ConnectionRecord, EngineError> {
        let state = self.lock();
        state.ensure_running()?;
        if state.has_fault(Fault::ConnectionRecordMissing) {
            return Err(not_found("connection", id.as_str()));
        }
        state.connection(id).cloned()
    }

    async fn create_invitation(&self) -> Result<Invitation, EngineError> {
        let mut state = self.lock();
        state.ensure_running()?;
        state.calls.push(Call::CreateInvitation);

        let out_of_band_id = OutOfBandId::new(state.next_id("oob"));
        state.invitations.push(out_of_band_id.clone());
        Ok(Invitation { url: invitation_url(&out_of_band_id), out_of_band_id })
    }

    async fn await_invitation_accepted(
        &self,
        out_of_band_id: &OutOfBandId,
    ) -> Result<ConnectionRecord, EngineError> {
        let mut events = {
            let state = self.lock();
            state.ensure_running()?;
            if !state.invitations.contains(out_of_band_id) {
                return Err(not_found("out-of-band", out_of_band_id.as_str()));
            }
            if let Some(record) = state.accepted_connection(out_of_band_id) {
                return Ok(record);
            }
            state.tx.subscribe()
        };

        if let Some(counterparty) = self.counterparty.clone() {
            tokio::time::sleep(counterparty.latency).await;
            let accepted = self.lock().accept_invitation(out_of_band_id, counterparty.label.clone());
            if let Some(record) = accepted {
                return Ok(record);
            }
        }

        loop {
            match events.recv().await {
                Ok(EngineEvent::ConnectionStateChanged { record, .. })
                    if record.out_of_band_id.as_ref() == Some(out_of_band_id)
                        && record.is_ready() =>
                {
                    return Ok(record);
                },
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    if let Some(record) = self.lock().accepted_connection(out_of_band_id) {
                        return Ok(record);
                    }
                },
                Err(RecvError::Closed) => return Err(EngineError::Shutdown),
            }
        }
    }

    async fn credentials(&self) -> Result<Vec<CredentialRecord>, EngineError> {
        let state = self.lock();
        state.ensure_running()?;
        if state.has_fault(Fault::WalletUnavailable) {
            return Err(EngineError::Internal("wallet unavailable".to_string()));
        }
        Ok(state.credentials.clone())
    }

    async fn accept_offer(&self, id: &CredentialId) -> Result<(), EngineError> {
        {
            let mut state = self.lock();
            state.ensure_running()?;
            state.calls.push(Call::AcceptOffer(id.clone()));

            let current = state.credential(id)?.state;
            if current != CredentialState::OfferReceived {
                return Err(invalid_state("accept offer", current));
            }
            state.set_credential_state(id, CredentialState::RequestSent)?;
            state.set_credential_state(id, CredentialState::CredentialReceived)?;
            state.set_credential_state(id, CredentialState::Done)?;
        }

        self.later(|engine, counterparty| {
            if let Some(request) = &counterparty.request_after_issue {
                let names: Vec<&str> = request.attributes.iter().map(String::as_str).collect();
                engine.receive_proof_request(&names);
            }
        });
        Ok(())
    }

    async fn decline_offer(&self, id: &CredentialId) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.ensure_running()?;
        state.calls.push(Call::DeclineOffer(id.clone()));

        let current = state.credential(id)?.state;
        if current != CredentialState::OfferReceived {
            return Err(invalid_state("decline offer", current));
        }
        state.set_credential_state(id, CredentialState::Declined).map(drop)
    }

    async fn delete_credential(&self, id: &CredentialId) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.ensure_running()?;
        state.calls.push(Call::DeleteCredential(id.clone()));

        if state.has_fault(Fault::DeleteRejected) {
            return Err(EngineError::Rejected("wallet refused deletion".to_string()));
        }
        let before = state.credentials.len();
        state.credentials.retain(|c| &c.id != id);
        if state.credentials.len() == before {
            return Err(not_found("credential", id.as_str()));
        }
        Ok(())
    }

    async fn import_did(&self, registry: Registry) -> Result<Did, EngineError> {
        let mut state = self.lock();
        state.ensure_running()?;
        state.calls.push(Call::ImportDid(registry));

        if state.has_fault(Fault::DidImportRejected) {
            return Err(EngineError::Rejected(format!("{registry} registry unavailable")));
        }
        let suffix = state.next_id("key");
        let did = Did::new(format!("did:{registry}:{suffix}"));
        state.did = Some(did.clone());
        Ok(did)
    }

    async fn offer_credential(
        &self,
        connection_id: &ConnectionId,
        offer: CredentialOffer,
    ) -> Result<CredentialRecord, EngineError> {
        let record = {
            let mut state = self.lock();
            state.ensure_running()?;
            state.calls.push(Call::OfferCredential(connection_id.clone()));

            if state.did.is_none() {
                return Err(invalid_state("offer credential", "no issuer DID"));
            }
            state.ready_connection(connection_id)?;
            state.insert_credential(
                Some(connection_id.clone()),
                CredentialState::OfferSent,
                offer.attributes,
                None,
            )
        };

        let id = record.id.clone();
        self.later(move |engine, _| {
            let mut state = engine.lock();
            for next in [
                CredentialState::RequestReceived,
                CredentialState::CredentialIssued,
                CredentialState::Done,
            ] {
                if state.set_credential_state(&id, next).is_err() {
                    break;
                }
            }
        });
        Ok(record)
    }

    async fn select_credentials(&self, id: &ProofId) -> Result<CredentialSelection, EngineError> {
        let state = self.lock();
        state.ensure_running()?;
        if state.has_fault(Fault::WalletUnavailable) {
            return Err(EngineError::Internal("wallet unavailable".to_string()));
        }

        let proof = state.proof(id)?;
        let attributes = proof
            .requested
            .iter()
            .map(|name| {
                let found = state.stored_value(name);
                SelectedAttribute {
                    name: name.clone(),
                    credential_id: found.as_ref().map(|(cred, _)| cred.clone()),
                    value: found.map(|(_, value)| value),
                }
            })
            .collect();
        Ok(CredentialSelection { attributes })
    }

    async fn accept_request(
        &self,
        id: &ProofId,
        selection: CredentialSelection,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.ensure_running()?;
        state.calls.push(Call::AcceptRequest(id.clone()));

        let current = state.proof(id)?.state;
        if current != ProofState::RequestReceived {
            return Err(invalid_state("accept proof request", current));
        }
        tracing::debug!(proof = %id, satisfied = selection.is_satisfied(), "presenting proof");
        state.set_proof_state(id, ProofState::PresentationSent, None)?;
        state.set_proof_state(id, ProofState::Done, None).map(drop)
    }

    async fn decline_request(&self, id: &ProofId) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.ensure_running()?;
        state.calls.push(Call::DeclineRequest(id.clone()));

        let current = state.proof(id)?.state;
        if current != ProofState::RequestReceived {
            return Err(invalid_state("decline proof request", current));
        }
        state.set_proof_state(id, ProofState::Declined, None).map(drop)
    }

    async fn request_proof(
        &self,
        connection_id: &ConnectionId,
        request: ProofRequest,
    ) -> Result<ProofRecord, EngineError> {
        let record = {
            let mut state = self.lock();
            state.ensure_running()?;
            state.calls.push(Call::RequestProof(connection_id.clone()));

            state.ready_connection(connection_id)?;
            state.insert_proof(Some(connection_id.clone()), ProofState::RequestSent, request.attributes)
        };

        let id = record.id.clone();
        self.later(move |engine, counterparty| {
            let mut state = engine.lock();
            if state.set_proof_state(&id, ProofState::PresentationReceived, None).is_ok() {
                let verified = Some(counterparty.verify_proofs);
                if state.set_proof_state(&id, ProofState::Done, verified).is_err() {
                    tracing::debug!(proof = %id, "proof vanished before verification");
                }
            }
        });
        Ok(record)
    }

    async fn send_message(&self, connection_id: &ConnectionId, content: &str) -> Result<(), EngineError> {
        {
            let mut state = self.lock();
            state.ensure_running()?;
            state.calls.push(Call::SendMessage {
                connection: connection_id.clone(),
                content: content.to_string(),
            });

            if state.has_fault(Fault::SendRejected) {
                return Err(EngineError::Rejected("peer unreachable".to_string()));
            }
            state.ready_connection(connection_id)?;
            state.insert_message(connection_id.clone(), MessageRole::Sender, content.to_string());
        }

        let reply = format!("echo: {content}");
        self.later(move |engine, counterparty| {
            if counterparty.echo_messages {
                engine.deliver_message(reply);
            }
        });
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.calls.push(Call::Shutdown);
        state.shut_down = true;
        Ok(())
    }
}
