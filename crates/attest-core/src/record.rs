//! Records handed out by the protocol engine.
//!
//! Records are opaque handles for one in-progress exchange. The interactive
//! layer only reads the identifier, the state tag and the attribute list used
//! for display; everything else stays inside the engine.

use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Wrap an engine-assigned identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

record_id!(
    /// Connection record identifier.
    ConnectionId
);
record_id!(
    /// Out-of-band invitation identifier.
    OutOfBandId
);
record_id!(
    /// Credential exchange record identifier.
    CredentialId
);
record_id!(
    /// Proof exchange record identifier.
    ProofId
);
record_id!(
    /// Basic message record identifier.
    MessageId
);
record_id!(
    /// Decentralized identifier imported into the wallet.
    Did
);

/// DID exchange state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Record created, nothing exchanged yet.
    Start,
    /// We published an invitation.
    InvitationSent,
    /// We received an invitation.
    InvitationReceived,
    /// Exchange request sent.
    RequestSent,
    /// Exchange request received.
    RequestReceived,
    /// Exchange response sent.
    ResponseSent,
    /// Exchange response received.
    ResponseReceived,
    /// Fully established.
    Completed,
    /// Exchange failed or was abandoned.
    Abandoned,
}

/// One connection with a remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// Record identifier.
    pub id: ConnectionId,
    /// Exchange state.
    pub state: ConnectionState,
    /// Invitation this connection was created from, if any.
    pub out_of_band_id: Option<OutOfBandId>,
    /// Label the remote peer announced.
    pub their_label: Option<String>,
}

impl ConnectionRecord {
    /// Whether the exchange has completed and messages can flow.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Completed
    }
}

/// Out-of-band invitation created for a remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    /// Invitation identifier, used to find the resulting connection.
    pub out_of_band_id: OutOfBandId,
    /// URL to hand to the remote peer.
    pub url: String,
}

/// A named attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

impl Attribute {
    /// Create an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Credential exchange state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialState {
    /// Proposal sent to the issuer.
    ProposalSent,
    /// Proposal received from a holder.
    ProposalReceived,
    /// Offer sent to a holder.
    OfferSent,
    /// Offer received from an issuer. Requires an operator decision.
    OfferReceived,
    /// Offer declined by the holder.
    Declined,
    /// Credential request sent.
    RequestSent,
    /// Credential request received.
    RequestReceived,
    /// Credential issued to the holder.
    CredentialIssued,
    /// Credential received from the issuer.
    CredentialReceived,
    /// Exchange finished; the credential is stored.
    Done,
    /// Exchange failed or was abandoned.
    Abandoned,
}

/// One credential exchange, stored or in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Record identifier.
    pub id: CredentialId,
    /// Connection the exchange runs over.
    pub connection_id: Option<ConnectionId>,
    /// Exchange state.
    pub state: CredentialState,
    /// Credential preview or issued attributes.
    pub attributes: Vec<Attribute>,
    /// Creation time (unix millis).
    pub created_at: u64,
    /// Last update time (unix millis). `None` when the engine never updated it.
    pub updated_at: Option<u64>,
}

/// Proof exchange state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofState {
    /// Request sent to a holder.
    RequestSent,
    /// Request received from a verifier. Requires an operator decision.
    RequestReceived,
    /// Presentation sent.
    PresentationSent,
    /// Presentation received.
    PresentationReceived,
    /// Request declined by the holder.
    Declined,
    /// Exchange finished; see [`ProofRecord::is_verified`].
    Done,
    /// Exchange failed or was abandoned.
    Abandoned,
}

/// One proof exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRecord {
    /// Record identifier.
    pub id: ProofId,
    /// Connection the exchange runs over.
    pub connection_id: Option<ConnectionId>,
    /// Exchange state.
    pub state: ProofState,
    /// Names of the requested attributes.
    pub requested: Vec<String>,
    /// Verification outcome, set by the verifier once the exchange is done.
    pub is_verified: Option<bool>,
}

/// Which side of a basic message exchange we are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageRole {
    /// We sent the message.
    Sender,
    /// We received the message.
    Receiver,
}

/// Plain-text message exchanged over a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicMessage {
    /// Record identifier.
    pub id: MessageId,
    /// Connection the message travelled over.
    pub connection_id: ConnectionId,
    /// Our role in the exchange.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Send time (unix millis).
    pub sent_time: u64,
}

/// Attribute values offered to a holder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOffer {
    /// Offered attributes.
    pub attributes: Vec<Attribute>,
}

/// Attributes a verifier asks a holder to disclose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofRequest {
    /// Requested attribute names.
    pub attributes: Vec<String>,
}

/// Stored credential chosen to satisfy one requested attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAttribute {
    /// Requested attribute name.
    pub name: String,
    /// Credential providing the value. `None` if nothing in the wallet matches.
    pub credential_id: Option<CredentialId>,
    /// Disclosed value. `None` if nothing in the wallet matches.
    pub value: Option<String>,
}

/// Engine's choice of stored credentials for a proof request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSelection {
    /// One entry per requested attribute.
    pub attributes: Vec<SelectedAttribute>,
}

impl CredentialSelection {
    /// Whether every requested attribute has a value.
    pub fn is_satisfied(&self) -> bool {
        self.attributes.iter().all(|a| a.value.is_some())
    }
}

/// Ledger a DID is imported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Registry {
    /// Hyperledger Indy network.
    Indy,
    /// cheqd network.
    Cheqd,
}

impl Registry {
    /// All supported registries in menu order.
    pub const ALL: [Self; 2] = [Self::Indy, Self::Cheqd];

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Indy => "indy",
            Self::Cheqd => "cheqd",
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
