//! Holder menu driver.

use attest_core::{CredentialRecord, Engine, ProofRecord};

use super::{Exit, Flow, chosen, menu_prompt};
use crate::{
    agent::HolderAgent,
    console::Console,
    listener::{Listener, SubDialog},
    output::Notice,
    prompt::{self, Prompter, StatusLine},
    state::SessionState,
};

/// Holder menu options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HolderAction {
    /// Paste an invitation URL and connect.
    ReceiveInvitation,
    /// Send a plain-text message.
    SendMessage,
    /// List stored credentials.
    ListCredentials,
    /// Remove one credential by id.
    RemoveCredential,
    /// Remove every credential.
    RemoveAllCredentials,
    /// Restart with a fresh engine.
    Restart,
    /// Quit.
    Exit,
}

impl HolderAction {
    /// Every option, in menu order.
    pub const ALL: [Self; 7] = [
        Self::ReceiveInvitation,
        Self::SendMessage,
        Self::ListCredentials,
        Self::RemoveCredential,
        Self::RemoveAllCredentials,
        Self::Restart,
        Self::Exit,
    ];

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Self::ReceiveInvitation => "Receive connection invitation",
            Self::SendMessage => "Send message",
            Self::ListCredentials => "List all credentials",
            Self::RemoveCredential => "Remove credential by ID",
            Self::RemoveAllCredentials => "Remove all credentials",
            Self::Restart => "Restart",
            Self::Exit => "Exit",
        }
    }

    /// Options offered in the given state. Messaging needs a connection.
    pub fn available(state: &SessionState) -> Vec<Self> {
        if state.is_connected() {
            return Self::ALL.to_vec();
        }
        Self::ALL.into_iter().filter(|a| *a != Self::SendMessage).collect()
    }
}

/// Interactive holder session.
///
/// Inbound messages are printed from the start. Credential offer and proof
/// request dialogs are enabled once the first connection completes.
#[derive(Debug)]
pub struct HolderMenu<E, P> {
    agent: HolderAgent<E>,
    console: Console<P>,
    dialogs_enabled: bool,
}

impl<E: Engine, P: Prompter> HolderMenu<E, P> {
    /// Build a session around a holder agent.
    pub fn new(agent: HolderAgent<E>, prompter: P, status: StatusLine) -> Self {
        let events = agent.engine().subscribe();
        let mut listener = Listener::new(agent.name());
        listener.listen_for_messages();
        listener.listen_for_connection_loss();

        Self { console: Console::new(prompter, events, listener, status), agent, dialogs_enabled: false }
    }

    /// Holder facade.
    pub fn agent(&self) -> &HolderAgent<E> {
        &self.agent
    }

    /// Console.
    pub fn console(&self) -> &Console<P> {
        &self.console
    }

    /// Mutable console.
    pub fn console_mut(&mut self) -> &mut Console<P> {
        &mut self.console
    }

    /// Options the next menu round offers.
    pub fn actions(&self) -> Vec<HolderAction> {
        HolderAction::available(self.agent.state())
    }

    /// Run until the operator restarts or quits.
    ///
    /// # Errors
    ///
    /// Returns the prompter's error if the frontend fails. Agent failures are
    /// printed and never end the session.
    pub async fn run(&mut self) -> Result<Exit, P::Error> {
        self.console.show(&Notice::Banner { title: format!("{} (holder)", self.agent.name()) })?;
        loop {
            if let Flow::Exit(exit) = self.step().await? {
                return Ok(exit);
            }
        }
    }

    /// One loop iteration: a queued dialog, or one menu round.
    pub async fn step(&mut self) -> Result<Flow, P::Error> {
        self.console.poll_events();
        for id in self.console.take_lost_connections() {
            self.agent.connection_lost(&id);
        }

        if let Some(dialog) = self.console.next_dialog() {
            self.sub_dialog(dialog).await?;
            return Ok(Flow::Continue);
        }

        if self.console.is_busy() {
            tokio::task::yield_now().await;
            return Ok(Flow::Continue);
        }

        let actions = self.actions();
        let prompt = menu_prompt(&actions, HolderAction::label);
        let Some(answer) = self.console.menu(prompt).await? else {
            return Ok(Flow::Continue);
        };
        let Some(action) = chosen(&actions, answer.choice()) else {
            return Ok(Flow::Continue);
        };

        tracing::debug!(?action, "holder action");
        self.dispatch(action).await
    }

    async fn dispatch(&mut self, action: HolderAction) -> Result<Flow, P::Error> {
        match action {
            HolderAction::ReceiveInvitation => self.receive_invitation().await?,
            HolderAction::SendMessage => self.send_message().await?,
            HolderAction::ListCredentials => self.list_credentials().await?,
            HolderAction::RemoveCredential => self.remove_credential().await?,
            HolderAction::RemoveAllCredentials => self.remove_all_credentials().await?,
            HolderAction::Restart => return self.leave(Exit::Restart).await,
            HolderAction::Exit => return self.leave(Exit::Quit).await,
        }
        Ok(Flow::Continue)
    }

    async fn receive_invitation(&mut self) -> Result<(), P::Error> {
        let url = self.console.input(prompt::INVITATION_URL).await?;
        match self.console.wait(self.agent.accept_connection(url.trim())).await {
            Ok(_) => {
                self.console.show(&Notice::ConnectionEstablished)?;
                if !self.dialogs_enabled {
                    self.console.listener_mut().listen_for_holder_dialogs();
                    self.dialogs_enabled = true;
                }
                Ok(())
            },
            Err(err) => self.console.report(&err),
        }
    }

    async fn send_message(&mut self) -> Result<(), P::Error> {
        let input = self.console.input(prompt::MESSAGE).await?;
        let Some(content) = prompt::parse_message(&input) else {
            return Ok(());
        };
        match self.console.wait(self.agent.send_message(content)).await {
            Ok(()) => Ok(()),
            Err(err) => self.console.report(&err),
        }
    }

    async fn list_credentials(&mut self) -> Result<(), P::Error> {
        let credentials = self.console.wait(self.agent.list_credentials()).await;
        self.console.show(&Notice::CredentialListing { credentials })
    }

    async fn remove_credential(&mut self) -> Result<(), P::Error> {
        let input = self.console.input(prompt::CREDENTIAL_ID).await?;
        let Some(id) = prompt::parse_credential_id(&input) else {
            return self.console.show(&Notice::EmptyCredentialId);
        };

        let notice = if self.console.wait(self.agent.remove_credential(&id)).await {
            Notice::CredentialRemoved { id }
        } else {
            Notice::CredentialNotRemoved { id }
        };
        self.console.show(&notice)
    }

    async fn remove_all_credentials(&mut self) -> Result<(), P::Error> {
        let summary = self.console.wait(self.agent.remove_all_credentials()).await;
        let notice = if summary.is_empty() {
            Notice::NoCredentialsToRemove
        } else {
            Notice::AllCredentialsRemoved { removed: summary.removed, failed: summary.failed }
        };
        self.console.show(&notice)
    }

    async fn leave(&mut self, exit: Exit) -> Result<Flow, P::Error> {
        if !self.console.confirm(prompt::CONFIRM).await? {
            return Ok(Flow::Continue);
        }
        if exit == Exit::Quit {
            self.console.show(&Notice::Exit)?;
        }
        if let Err(err) = self.console.wait(self.agent.shutdown()).await {
            self.console.report(&err)?;
        }
        Ok(Flow::Exit(exit))
    }

    /// Run one gated dialog. The gate is released on every exit path.
    async fn sub_dialog(&mut self, dialog: SubDialog) -> Result<(), P::Error> {
        let gate = self.console.gate();
        let Some(_guard) = gate.acquire() else {
            self.console.listener_mut().defer_front(dialog);
            return Ok(());
        };

        let result = match dialog.clone() {
            SubDialog::CredentialOffer(record) => self.credential_offer(record).await,
            SubDialog::ProofRequest(record) => self.proof_request(record).await,
            SubDialog::Acknowledge { title } => self.console.confirm(&title).await.map(drop),
        };
        self.console.listener_mut().settle(&dialog);
        result
    }

    async fn credential_offer(&mut self, record: CredentialRecord) -> Result<(), P::Error> {
        let CredentialRecord { id, attributes, .. } = record;
        self.console.show(&Notice::CredentialPreview { attributes })?;

        let result = if self.console.confirm(prompt::CREDENTIAL_OFFER).await? {
            self.console.wait(self.agent.accept_credential_offer(&id)).await
        } else {
            self.console.wait(self.agent.decline_credential_offer(&id)).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.console.report(&err),
        }
    }

    async fn proof_request(&mut self, record: ProofRecord) -> Result<(), P::Error> {
        let selection = match self.console.wait(self.agent.requested_attributes(&record.id)).await {
            Ok(selection) => selection,
            Err(err) => {
                tracing::warn!(proof = %record.id, error = %err, "cannot resolve requested attributes");
                return self.console.show(&Notice::WalletUnavailable);
            },
        };
        self.console.show(&Notice::ProofAttributes { selection })?;

        if self.console.confirm(prompt::PROOF_REQUEST).await? {
            match self.console.wait(self.agent.accept_proof_request(&record.id)).await {
                Ok(()) => self.console.show(&Notice::ProofAccepted),
                Err(err) => self.console.report(&err),
            }
        } else {
            match self.console.wait(self.agent.decline_proof_request(&record.id)).await {
                Ok(()) => Ok(()),
                Err(err) => self.console.report(&err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use attest_core::ConnectionId;

    use super::*;

    #[test]
    fn messaging_hidden_until_connected() {
        let mut state = SessionState::new();
        let offline = HolderAction::available(&state);
        assert!(!offline.contains(&HolderAction::SendMessage));
        assert_eq!(offline.first(), Some(&HolderAction::ReceiveInvitation));
        assert_eq!(offline.last(), Some(&HolderAction::Exit));

        state.connect(ConnectionId::new("conn-1"));
        assert_eq!(HolderAction::available(&state), HolderAction::ALL.to_vec());
    }
}
