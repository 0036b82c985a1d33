//! Interactive coordination layer for a credential exchange agent.
//!
//! The crate sits between a long-lived protocol [`Engine`](attest_core::Engine)
//! and an operator at a terminal. It owns no I/O of its own: prompts go
//! through a [`Prompter`], events arrive on the engine's broadcast stream.
//!
//! # Architecture
//!
//! - [`Listener`]: maps engine events to status lines and gated dialogs
//! - [`Gate`]: busy flag that keeps the menu and dialogs from interleaving
//! - [`Console`]: awaits prompts and engine calls while routing events
//! - [`HolderMenu`] / [`IssuerMenu`]: per-role menu loops
//! - [`HolderAgent`] / [`IssuerAgent`]: per-role engine facades
//!
//! Each menu round re-renders the option list from session state, so a
//! dialog that preempts the menu simply makes the next round start later.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod agent;
mod config;
mod console;
mod error;
mod gate;
pub mod listener;
pub mod menu;
pub mod output;
pub mod prompt;
mod state;

pub use agent::{HolderAgent, IssuerAgent, RemovalSummary};
pub use config::{AgentConfig, DEFAULT_LABEL};
pub use console::Console;
pub use error::AgentError;
pub use gate::{Gate, GateGuard};
pub use listener::{Handler, Listener, Reaction, SubDialog, SubscriptionId};
pub use menu::{Exit, Flow, HolderAction, HolderMenu, IssuerAction, IssuerMenu};
pub use output::{Line, Notice, Span, Tone};
pub use prompt::{Answer, Prompt, Prompter, StatusFeed, StatusLine, status_line};
pub use state::{IssuerState, SessionState};
