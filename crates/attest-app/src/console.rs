//! Event pump around prompts and engine calls.
//!
//! Everything the menu drivers await goes through a [`Console`]: prompts,
//! confirmations and engine calls. While the awaited future is pending, the
//! console keeps receiving engine events and runs them through the
//! [`Listener`]. Status reactions are posted to the [`StatusLine`] at once.
//! Dialog reactions are queued; only the top-level menu prompt is abandoned
//! for them (see [`Console::menu`]).
//!
//! The loop is single-threaded and cooperative. Dialogs raised while another
//! dialog owns the gate wait in the listener's queue.

use std::future::Future;

use attest_core::{ConnectionId, EngineEvent};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    error::AgentError,
    gate::Gate,
    listener::{Listener, Reaction, SubDialog},
    output::Notice,
    prompt::{Answer, Prompt, Prompter, StatusLine},
};

/// Prompter plus event plumbing for one session.
#[derive(Debug)]
pub struct Console<P> {
    prompter: P,
    events: EventPump,
    listener: Listener,
}

/// Event receiver and routing state, borrowed disjointly from the prompter.
#[derive(Debug)]
struct EventPump {
    events: broadcast::Receiver<EngineEvent>,
    status: StatusLine,
    lost: Vec<ConnectionId>,
    closed: bool,
}

impl EventPump {
    /// Route one event. Returns true if a dialog was queued.
    fn route(&mut self, listener: &mut Listener, event: &EngineEvent) -> bool {
        let mut queued = false;
        for reaction in listener.dispatch(event) {
            match reaction {
                Reaction::Status(notice) => self.status.post(&notice),
                Reaction::Dialog(dialog) => {
                    tracing::debug!(?dialog, "dialog queued");
                    listener.defer(dialog);
                    queued = true;
                },
                Reaction::ConnectionLost(id) => {
                    self.status.post(&Notice::ConnectionLost);
                    self.lost.push(id);
                },
            }
        }
        queued
    }

    /// Receive the next event, or `None` once the engine is gone.
    async fn recv(&mut self) -> Option<EngineEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged, events dropped");
                },
                Err(RecvError::Closed) => {
                    tracing::debug!("event stream closed");
                    self.closed = true;
                    return None;
                },
            }
        }
    }

    /// Await `fut` while routing events.
    async fn drive<F: Future>(&mut self, listener: &mut Listener, fut: F) -> F::Output {
        tokio::pin!(fut);
        loop {
            if self.closed {
                return fut.await;
            }

            tokio::select! {
                biased;

                output = &mut fut => return output,

                event = self.recv() => {
                    if let Some(event) = event {
                        self.route(listener, &event);
                    }
                },
            }
        }
    }

    /// Await `fut` while routing events, giving up once a dialog is queued.
    ///
    /// Returns `None` if preempted; `fut` is dropped in that case.
    async fn drive_until_dialog<F: Future>(
        &mut self,
        listener: &mut Listener,
        fut: F,
    ) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            if self.closed {
                return Some(fut.await);
            }

            tokio::select! {
                biased;

                output = &mut fut => return Some(output),

                event = self.recv() => {
                    if let Some(event) = event
                        && self.route(listener, &event)
                    {
                        return None;
                    }
                },
            }
        }
    }
}

impl<P: Prompter> Console<P> {
    /// Assemble a console.
    ///
    /// `events` must be subscribed before any engine call the session makes,
    /// so no transition is missed.
    pub fn new(
        prompter: P,
        events: broadcast::Receiver<EngineEvent>,
        listener: Listener,
        status: StatusLine,
    ) -> Self {
        Self {
            prompter,
            events: EventPump { events, status, lost: Vec::new(), closed: false },
            listener,
        }
    }

    /// Subscription table.
    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Mutable subscription table.
    pub fn listener_mut(&mut self) -> &mut Listener {
        &mut self.listener
    }

    /// Busy gate. Cloning shares the flag.
    pub fn gate(&self) -> Gate {
        self.listener.gate().clone()
    }

    /// Whether a sub-dialog is running.
    pub fn is_busy(&self) -> bool {
        self.listener.is_busy()
    }

    /// Underlying prompter.
    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Mutable prompter.
    pub fn prompter_mut(&mut self) -> &mut P {
        &mut self.prompter
    }

    /// Print a notice.
    pub fn show(&mut self, notice: &Notice) -> Result<(), P::Error> {
        self.prompter.show(&notice.lines())
    }

    /// Print an agent failure and log it.
    pub fn report(&mut self, err: &AgentError) -> Result<(), P::Error> {
        tracing::warn!(error = %err, "operation failed");
        self.show(&Notice::Failure { message: err.to_string() })
    }

    /// Ask a question. Dialogs arriving meanwhile are queued.
    pub async fn ask(&mut self, prompt: Prompt) -> Result<Answer, P::Error> {
        let Self { prompter, events, listener } = self;
        events.drive(listener, prompter.ask(prompt)).await
    }

    /// Present the top-level menu.
    ///
    /// Returns `Ok(None)` if a dialog arrived before the operator answered;
    /// the menu prompt is abandoned and the dialog waits in the queue.
    pub async fn menu(&mut self, prompt: Prompt) -> Result<Option<Answer>, P::Error> {
        let Self { prompter, events, listener } = self;
        match events.drive_until_dialog(listener, prompter.ask(prompt)).await {
            Some(answer) => answer.map(Some),
            None => Ok(None),
        }
    }

    /// Ask for YES/NO.
    pub async fn confirm(&mut self, title: &str) -> Result<bool, P::Error> {
        Ok(self.ask(Prompt::confirm(title)).await?.is_yes())
    }

    /// Ask for free text.
    pub async fn input(&mut self, title: &str) -> Result<String, P::Error> {
        Ok(self.ask(Prompt::input(title)).await?.into_text())
    }

    /// Await an engine call while routing events.
    pub async fn wait<F: Future>(&mut self, fut: F) -> F::Output {
        let Self { events, listener, .. } = self;
        events.drive(listener, fut).await
    }

    /// Route every event already buffered without blocking.
    pub fn poll_events(&mut self) {
        while !self.events.closed {
            match self.events.events.try_recv() {
                Ok(event) => {
                    self.events.route(&mut self.listener, &event);
                },
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged, events dropped");
                },
                Err(broadcast::error::TryRecvError::Closed) => self.events.closed = true,
                Err(broadcast::error::TryRecvError::Empty) => break,
            }
        }
    }

    /// Next queued dialog.
    pub fn next_dialog(&mut self) -> Option<SubDialog> {
        self.listener.next_dialog()
    }

    /// Connections reported lost since the last call.
    pub fn take_lost_connections(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.events.lost)
    }
}
