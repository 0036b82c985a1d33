//! Role facades over the protocol engine.
//!
//! Each facade owns its role's session state and turns engine results into
//! [`AgentError`](crate::AgentError)s the menu drivers can report. Facades
//! never prompt or print; diagnostics go to `tracing`.

mod holder;
mod issuer;

pub use holder::{HolderAgent, RemovalSummary, sort_by_update};
pub use issuer::IssuerAgent;
