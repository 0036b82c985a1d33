//! Event subscriptions and dispatch.
//!
//! The [`Listener`] maps engine events to [`Reaction`]s. Subscriptions pair an
//! [`EventKind`] with a state predicate and a [`Handler`]; dispatch is pure
//! and never touches the prompter. The caller renders [`Reaction::Status`]
//! immediately and runs [`Reaction::Dialog`]s under the busy [`Gate`].
//!
//! Dialogs that arrive while another one is running wait in a FIFO queue.

use std::collections::{HashSet, VecDeque};

use attest_core::{
    ConnectionId, ConnectionState, CredentialId, CredentialRecord, CredentialState, EngineEvent,
    EventKind, MessageRole, ProofId, ProofRecord, ProofState,
};

use crate::{gate::Gate, output::Notice};

/// State filter applied to events of a subscribed kind.
pub type Predicate = fn(&EngineEvent) -> bool;

/// Inbound message from the remote peer.
pub fn is_received_message(event: &EngineEvent) -> bool {
    event.message().is_some_and(|m| m.role == MessageRole::Receiver)
}

/// Credential offer waiting for the holder's decision.
pub fn is_credential_offer(event: &EngineEvent) -> bool {
    event.credential().is_some_and(|c| c.state == CredentialState::OfferReceived)
}

/// Proof request waiting for the holder's decision.
pub fn is_proof_request(event: &EngineEvent) -> bool {
    event.proof().is_some_and(|p| p.state == ProofState::RequestReceived)
}

/// Proof exchange reached a final state on the verifier side.
pub fn is_proof_finished(event: &EngineEvent) -> bool {
    event.proof().is_some_and(|p| {
        matches!(p.state, ProofState::Done | ProofState::Declined | ProofState::Abandoned)
    })
}

/// Connection abandoned by the engine.
pub fn is_connection_abandoned(event: &EngineEvent) -> bool {
    matches!(
        event,
        EngineEvent::ConnectionStateChanged { record, .. }
            if record.state == ConnectionState::Abandoned
    )
}

/// What to do with a matching event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Handler {
    /// Print the message text as a status line.
    InboundMessage,
    /// Open the credential offer dialog.
    CredentialOffer,
    /// Open the proof request dialog.
    ProofRequest,
    /// Print the verification outcome of this proof.
    ProofOutcome(ProofId),
    /// Report the loss of a connection.
    ConnectionClosed,
}

/// Handle returned by [`Listener::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone)]
struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    predicate: Predicate,
    handler: Handler,
    once: bool,
}

/// Event-triggered dialog that needs the operator's exclusive attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubDialog {
    /// Holder decides on a credential offer.
    CredentialOffer(CredentialRecord),
    /// Holder decides on a proof request.
    ProofRequest(ProofRecord),
    /// Issuer confirms the peer saw something.
    Acknowledge {
        /// Question text.
        title: String,
    },
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Render a status line without interrupting any prompt.
    Status(Notice),
    /// Run a gated sub-dialog.
    Dialog(SubDialog),
    /// The given connection is gone.
    ConnectionLost(ConnectionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DialogKey {
    Credential(CredentialId),
    Proof(ProofId),
}

/// Subscription table, gate and pending-dialog queue.
///
/// # Invariants
///
/// - One-shot subscriptions are removed by the dispatch that fires them.
/// - A dialog is raised at most once per record id; repeated events for the
///   same offer or request do not prompt twice.
#[derive(Debug)]
pub struct Listener {
    name: String,
    gate: Gate,
    subscriptions: Vec<Subscription>,
    next_id: u64,
    pending: VecDeque<SubDialog>,
    raised: HashSet<DialogKey>,
}

impl Listener {
    /// Create a listener for the agent with the given label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gate: Gate::new(),
            subscriptions: Vec::new(),
            next_id: 0,
            pending: VecDeque::new(),
            raised: HashSet::new(),
        }
    }

    /// Busy gate guarding sub-dialogs.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Whether a sub-dialog is running.
    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Register a persistent subscription.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        predicate: Predicate,
        handler: Handler,
    ) -> SubscriptionId {
        self.insert(kind, predicate, handler, false)
    }

    /// Register a subscription that is removed after its first match.
    pub fn subscribe_once(
        &mut self,
        kind: EventKind,
        predicate: Predicate,
        handler: Handler,
    ) -> SubscriptionId {
        self.insert(kind, predicate, handler, true)
    }

    fn insert(
        &mut self,
        kind: EventKind,
        predicate: Predicate,
        handler: Handler,
        once: bool,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        tracing::debug!(?id, ?kind, ?handler, once, "subscribed");
        self.subscriptions.push(Subscription { id, kind, predicate, handler, once });
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    /// Whether the subscription is still registered.
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.iter().any(|s| s.id == id)
    }

    /// Number of registered subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Inbound messages become status lines.
    pub fn listen_for_messages(&mut self) -> SubscriptionId {
        self.subscribe(EventKind::BasicMessageStateChanged, is_received_message, Handler::InboundMessage)
    }

    /// Credential offers and proof requests become dialogs.
    pub fn listen_for_holder_dialogs(&mut self) -> [SubscriptionId; 2] {
        [
            self.subscribe(
                EventKind::CredentialStateChanged,
                is_credential_offer,
                Handler::CredentialOffer,
            ),
            self.subscribe(EventKind::ProofStateChanged, is_proof_request, Handler::ProofRequest),
        ]
    }

    /// The outcome of proof `id` is printed once it is final.
    pub fn listen_for_proof_outcome(&mut self, id: ProofId) -> SubscriptionId {
        self.subscribe_once(
            EventKind::ProofStateChanged,
            is_proof_finished,
            Handler::ProofOutcome(id),
        )
    }

    /// Abandoned connections are reported.
    pub fn listen_for_connection_loss(&mut self) -> SubscriptionId {
        self.subscribe(
            EventKind::ConnectionStateChanged,
            is_connection_abandoned,
            Handler::ConnectionClosed,
        )
    }

    /// Run every matching subscription against the event.
    ///
    /// Reactions come back in registration order.
    pub fn dispatch(&mut self, event: &EngineEvent) -> Vec<Reaction> {
        let kind = event.kind();
        let mut fired = Vec::new();
        let mut reactions = Vec::new();

        for subscription in &self.subscriptions {
            if subscription.kind != kind || !(subscription.predicate)(event) {
                continue;
            }
            let Some(reaction) = self.react(&subscription.handler, event) else {
                continue;
            };
            if subscription.once {
                fired.push(subscription.id);
            }
            reactions.push(reaction);
        }

        if !fired.is_empty() {
            self.subscriptions.retain(|s| !fired.contains(&s.id));
        }

        reactions.retain(|reaction| match reaction {
            Reaction::Dialog(dialog) => match dialog_key(dialog) {
                Some(key) => self.raised.insert(key),
                None => true,
            },
            _ => true,
        });

        reactions
    }

    fn react(&self, handler: &Handler, event: &EngineEvent) -> Option<Reaction> {
        match handler {
            Handler::InboundMessage => event.message().map(|message| {
                Reaction::Status(Notice::MessageReceived {
                    name: self.name.clone(),
                    content: message.content.clone(),
                })
            }),
            Handler::CredentialOffer => {
                event.credential().map(|r| Reaction::Dialog(SubDialog::CredentialOffer(r.clone())))
            },
            Handler::ProofRequest => {
                event.proof().map(|r| Reaction::Dialog(SubDialog::ProofRequest(r.clone())))
            },
            Handler::ProofOutcome(id) => {
                event.proof().filter(|record| &record.id == id).map(|record| {
                    Reaction::Status(Notice::ProofVerified {
                        verified: record.state == ProofState::Done
                            && record.is_verified.unwrap_or(false),
                    })
                })
            },
            Handler::ConnectionClosed => match event {
                EngineEvent::ConnectionStateChanged { record, .. } => {
                    Some(Reaction::ConnectionLost(record.id.clone()))
                },
                _ => None,
            },
        }
    }

    /// Queue a dialog behind any already waiting.
    pub fn defer(&mut self, dialog: SubDialog) {
        self.pending.push_back(dialog);
    }

    /// Put a dialog back at the head of the queue.
    pub fn defer_front(&mut self, dialog: SubDialog) {
        self.pending.push_front(dialog);
    }

    /// Next waiting dialog, oldest first.
    pub fn next_dialog(&mut self) -> Option<SubDialog> {
        self.pending.pop_front()
    }

    /// Number of waiting dialogs.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Forget a dialog that has run, so its record id is no longer tracked.
    pub fn settle(&mut self, dialog: &SubDialog) {
        if let Some(key) = dialog_key(dialog) {
            self.raised.remove(&key);
        }
    }

    /// Number of records whose dialog is queued or running.
    pub fn raised(&self) -> usize {
        self.raised.len()
    }
}

fn dialog_key(dialog: &SubDialog) -> Option<DialogKey> {
    match dialog {
        SubDialog::CredentialOffer(record) => Some(DialogKey::Credential(record.id.clone())),
        SubDialog::ProofRequest(record) => Some(DialogKey::Proof(record.id.clone())),
        SubDialog::Acknowledge { .. } => None,
    }
}
