//! Issuer/verifier menu driver.

use attest_core::{Engine, Registry};

use super::{Exit, Flow, chosen, menu_prompt};
use crate::{
    agent::IssuerAgent,
    console::Console,
    listener::{Listener, SubDialog},
    output::Notice,
    prompt::{self, Prompt, Prompter, StatusLine},
    state::IssuerState,
};

/// Issuer menu options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssuerAction {
    /// Create an invitation and wait for the holder.
    CreateConnection,
    /// Import a DID and offer the configured credential.
    OfferCredential,
    /// Request the configured proof.
    RequestProof,
    /// Send a plain-text message.
    SendMessage,
    /// Restart with a fresh engine.
    Restart,
    /// Quit.
    Exit,
}

impl IssuerAction {
    /// Every option, in menu order.
    pub const ALL: [Self; 6] = [
        Self::CreateConnection,
        Self::OfferCredential,
        Self::RequestProof,
        Self::SendMessage,
        Self::Restart,
        Self::Exit,
    ];

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Self::CreateConnection => "Create connection invitation",
            Self::OfferCredential => "Offer credential",
            Self::RequestProof => "Request proof",
            Self::SendMessage => "Send message",
            Self::Restart => "Restart",
            Self::Exit => "Exit",
        }
    }

    /// Options offered in the given state.
    ///
    /// Until an invitation exists only connection setup, restart and exit
    /// are offered.
    pub fn available(state: &IssuerState) -> Vec<Self> {
        if state.has_invitation() {
            Self::ALL.to_vec()
        } else {
            vec![Self::CreateConnection, Self::Restart, Self::Exit]
        }
    }
}

/// Interactive issuer/verifier session.
#[derive(Debug)]
pub struct IssuerMenu<E, P> {
    agent: IssuerAgent<E>,
    console: Console<P>,
}

impl<E: Engine, P: Prompter> IssuerMenu<E, P> {
    /// Build a session around an issuer agent.
    pub fn new(agent: IssuerAgent<E>, prompter: P, status: StatusLine) -> Self {
        let events = agent.engine().subscribe();
        let mut listener = Listener::new(agent.name());
        listener.listen_for_messages();
        listener.listen_for_connection_loss();

        Self { console: Console::new(prompter, events, listener, status), agent }
    }

    /// Issuer facade.
    pub fn agent(&self) -> &IssuerAgent<E> {
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
    pub fn actions(&self) -> Vec<IssuerAction> {
        IssuerAction::available(self.agent.state())
    }

    /// Run until the operator restarts or quits.
    ///
    /// # Errors
    ///
    /// Returns the prompter's error if the frontend fails.
    pub async fn run(&mut self) -> Result<Exit, P::Error> {
        self.console.show(&Notice::Banner { title: format!("{} (issuer)", self.agent.name()) })?;
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
        let prompt = menu_prompt(&actions, IssuerAction::label);
        let Some(answer) = self.console.menu(prompt).await? else {
            return Ok(Flow::Continue);
        };
        let Some(action) = chosen(&actions, answer.choice()) else {
            return Ok(Flow::Continue);
        };

        tracing::debug!(?action, "issuer action");
        self.dispatch(action).await
    }

    async fn dispatch(&mut self, action: IssuerAction) -> Result<Flow, P::Error> {
        match action {
            IssuerAction::CreateConnection => self.create_connection().await?,
            IssuerAction::OfferCredential => self.offer_credential().await?,
            IssuerAction::RequestProof => self.request_proof().await?,
            IssuerAction::SendMessage => self.send_message().await?,
            IssuerAction::Restart => return self.leave(Exit::Restart).await,
            IssuerAction::Exit => return self.leave(Exit::Quit).await,
        }
        Ok(Flow::Continue)
    }

    async fn create_connection(&mut self) -> Result<(), P::Error> {
        let invitation = match self.console.wait(self.agent.create_invitation()).await {
            Ok(invitation) => invitation,
            Err(err) => return self.console.report(&err),
        };
        self.console.show(&Notice::InvitationCreated { url: invitation.url })?;
        self.console.show(&Notice::WaitingForConnection)?;

        match self.console.wait(self.agent.await_connection()).await {
            Ok(_) => self.console.show(&Notice::ConnectionEstablished),
            Err(err) => self.console.report(&err),
        }
    }

    async fn offer_credential(&mut self) -> Result<(), P::Error> {
        let prompt = Prompt::select(prompt::REGISTRY, Registry::ALL.map(Registry::label));
        let answer = self.console.ask(prompt).await?;
        let Some(registry) = chosen(&Registry::ALL, answer.choice()) else {
            return Ok(());
        };

        match self.console.wait(self.agent.import_did(registry)).await {
            Ok(did) => self.console.show(&Notice::DidImported { did })?,
            Err(err) => return self.console.report(&err),
        }
        match self.console.wait(self.agent.offer_credential()).await {
            Ok(_) => self.console.show(&Notice::CredentialOffered)?,
            Err(err) => return self.console.report(&err),
        }

        self.sub_dialog(SubDialog::Acknowledge { title: prompt::OFFER_RECEIVED.to_string() }).await
    }

    async fn request_proof(&mut self) -> Result<(), P::Error> {
        // The proof only turns final after the peer presents, which needs
        // the request to be out first.
        let record = match self.console.wait(self.agent.request_proof()).await {
            Ok(record) => record,
            Err(err) => return self.console.report(&err),
        };
        self.console.listener_mut().listen_for_proof_outcome(record.id);
        self.console.show(&Notice::ProofRequested)?;

        self.sub_dialog(SubDialog::Acknowledge { title: prompt::PROOF_RECEIVED.to_string() }).await
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

        match dialog {
            SubDialog::Acknowledge { title } => self.console.confirm(&title).await.map(drop),
            other => {
                tracing::warn!(dialog = ?other, "issuer ignores holder dialog");
                Ok(())
            },
        }
    }
}
