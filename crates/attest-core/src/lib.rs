//! Protocol engine contract for Attest.
//!
//! The credential exchange engine (connections, DID exchange, issuance, proof
//! exchange, wallet storage) is an external collaborator. This crate pins down
//! the surface the interactive layer consumes from it:
//!
//! - [`Engine`]: async operations plus a broadcast stream of state changes
//! - [`EngineEvent`]: typed state-change notifications
//! - Record types: opaque handles for in-progress exchanges
//!
//! Nothing here interprets protocol payloads beyond a state tag and a list of
//! display attributes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod engine;
mod error;
mod event;
pub mod record;

pub use engine::Engine;
pub use error::EngineError;
pub use event::{EngineEvent, EventKind};
pub use record::{
    Attribute, BasicMessage, ConnectionId, ConnectionRecord, ConnectionState, CredentialId,
    CredentialOffer, CredentialRecord, CredentialSelection, CredentialState, Did, Invitation,
    MessageId, MessageRole, OutOfBandId, ProofId, ProofRecord, ProofRequest, ProofState, Registry,
    SelectedAttribute,
};
