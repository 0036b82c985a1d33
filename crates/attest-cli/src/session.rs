//! Session lifecycle.
//!
//! Runs one role's menu against a simulated engine and peer. "Restart" in the
//! menu tears the whole session down (engine, listener, prompter) and starts
//! over from a fresh engine; "Exit" or Ctrl-C ends the process.

use std::time::Duration;

use attest_app::{
    AgentConfig, Exit, HolderAgent, HolderMenu, IssuerAgent, IssuerMenu, Line, Prompter, Tone,
    status_line,
};
use attest_core::OutOfBandId;
use attest_harness::{Counterparty, SimEngine, invitation_url};
use clap::Subcommand;

use crate::terminal::{TerminalError, TerminalPrompter};

/// Which side of the exchange the operator plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Role {
    /// Receive credentials and answer proof requests
    Holder,
    /// Issue credentials and request proofs
    Issuer,
}

/// Settings shared by every round of a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// The operator's agent configuration.
    pub config: AgentConfig,
    /// Reaction delay of the simulated peer.
    pub latency: Duration,
}

impl SessionOptions {
    /// Fresh engine for one round, with a peer playing the opposite role.
    pub fn engine(&self, role: Role, seed: u64) -> SimEngine {
        let peer = match role {
            Role::Holder => Counterparty::issuer(
                "Faber",
                self.config.credential.clone(),
                self.config.proof.clone(),
            ),
            Role::Issuer => Counterparty::new("Alice"),
        };
        SimEngine::with_seed(seed).with_counterparty(peer.with_latency(self.latency).echoing())
    }
}

/// Invitation the simulated issuer hands out to a holder.
pub fn demo_invitation() -> String {
    invitation_url(&OutOfBandId::new("demo"))
}

/// Run sessions until the operator exits.
///
/// # Errors
///
/// Returns an error if the terminal fails. Ctrl-C is a normal exit.
pub async fn run(role: Role, options: &SessionOptions) -> Result<(), TerminalError> {
    let mut round = 0u64;
    loop {
        let engine = options.engine(role, round);
        let (status, feed) = status_line();
        let mut prompter = TerminalPrompter::new(feed)?;

        let result = match role {
            Role::Holder => {
                prompter.show(&[Line::plain("Demo invitation: ")
                    .with(Tone::Info, demo_invitation())])?;
                let agent = HolderAgent::new(engine, options.config.label.clone());
                let mut menu = HolderMenu::new(agent, prompter, status);
                menu.run().await
            },
            Role::Issuer => {
                let agent = IssuerAgent::new(engine, options.config.clone());
                let mut menu = IssuerMenu::new(agent, prompter, status);
                menu.run().await
            },
        };

        match result {
            Ok(Exit::Restart) => {
                round += 1;
                tracing::info!(round, ?role, "restarting session");
            },
            Ok(Exit::Quit) | Err(TerminalError::Interrupted) => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}
