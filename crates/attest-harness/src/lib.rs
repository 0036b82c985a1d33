//! Simulation harness for the attest interactive layer.
//!
//! Drives the real menu drivers from `attest-app` against an in-memory engine
//! and a scripted operator, so every interaction path can be tested without a
//! terminal, wallet or network.
//!
//! # Components
//!
//! - [`SimEngine`]: [`Engine`](attest_core::Engine) over plain records, with
//!   fault injection, a call journal and an optional simulated peer
//! - [`ScriptedPrompter`]: [`Prompter`](attest_app::Prompter) that answers
//!   from a script and records a transcript
//! - [`InvariantRegistry`]: properties every transcript must satisfy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod scripted_prompter;
pub mod sim_engine;

pub use invariants::{
    ChoicesInRange, DialogsHoldGate, GateReleasedAtRest, Invariant, InvariantRegistry,
    InvariantResult, MenuOnlyWhenIdle, OnlyMenusAbandoned, SessionSnapshot, Violation,
};
pub use scripted_prompter::{Exchange, ScriptError, ScriptedPrompter};
pub use sim_engine::{Call, Counterparty, Fault, INVITATION_BASE, SimEngine, invitation_url, parse_invitation};
