//! Prompt primitives and the prompter trait.
//!
//! The interactive layer asks the operator three kinds of questions: pick one
//! option from a list, type free text, or confirm with YES/NO. A [`Prompter`]
//! renders them and resolves the answer. Output that arrives while a prompt is
//! pending goes through a [`StatusLine`] so it never replaces the prompt.

use std::future::Future;

use attest_core::CredentialId;
use tokio::sync::mpsc;

use crate::output::{Line, Notice};

/// Title of the main menu.
pub const OPTIONS: &str = "Options:";
/// Invitation URL input.
pub const INVITATION_URL: &str = "Enter the connection invitation URL:";
/// Credential offer decision.
pub const CREDENTIAL_OFFER: &str = "Would you like to accept the credential offer?";
/// Proof request decision.
pub const PROOF_REQUEST: &str = "Would you like to accept the proof request?";
/// Free-text message input.
pub const MESSAGE: &str = "Write your message (q to cancel):";
/// Credential id input for removal.
pub const CREDENTIAL_ID: &str = "Please enter the credential ID to proceed with removal:";
/// Registry selection before offering a credential.
pub const REGISTRY: &str = "Select the registry for the issuer DID:";
/// Restart/exit confirmation.
pub const CONFIRM: &str = "Are you sure?";
/// Issuer acknowledgement after sending an offer.
pub const OFFER_RECEIVED: &str = "Is the credential offer received?";
/// Verifier acknowledgement after sending a proof request.
pub const PROOF_RECEIVED: &str = "Is the proof request received?";

/// Labels of the two confirmation choices.
pub const CONFIRM_CHOICES: [&str; 2] = ["YES", "NO"];

/// A question for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Choose one of `options`.
    Select {
        /// Question text.
        title: String,
        /// Choices in display order.
        options: Vec<String>,
    },
    /// Type free text.
    Input {
        /// Question text.
        title: String,
    },
    /// Answer YES or NO.
    Confirm {
        /// Question text.
        title: String,
    },
}

impl Prompt {
    /// Main menu over the given option labels.
    pub fn menu<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::select(OPTIONS, options)
    }

    /// Selection prompt.
    pub fn select<I, S>(title: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Select { title: title.into(), options: options.into_iter().map(Into::into).collect() }
    }

    /// Free-text prompt.
    pub fn input(title: impl Into<String>) -> Self {
        Self::Input { title: title.into() }
    }

    /// YES/NO prompt.
    pub fn confirm(title: impl Into<String>) -> Self {
        Self::Confirm { title: title.into() }
    }

    /// Question text.
    pub fn title(&self) -> &str {
        match self {
            Self::Select { title, .. } | Self::Input { title } | Self::Confirm { title } => title,
        }
    }

    /// Selectable labels. Empty for free-text prompts.
    pub fn choices(&self) -> Vec<&str> {
        match self {
            Self::Select { options, .. } => options.iter().map(String::as_str).collect(),
            Self::Confirm { .. } => CONFIRM_CHOICES.to_vec(),
            Self::Input { .. } => Vec::new(),
        }
    }
}

/// The operator's answer to a [`Prompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Index into the prompt's options.
    Choice(usize),
    /// Free text as typed.
    Text(String),
    /// YES (`true`) or NO (`false`).
    Confirmed(bool),
}

impl Answer {
    /// Selected index, if this is a selection answer.
    pub fn choice(&self) -> Option<usize> {
        match self {
            Self::Choice(index) => Some(*index),
            _ => None,
        }
    }

    /// Typed text. Non-text answers read as empty input.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            _ => String::new(),
        }
    }

    /// Whether the operator said YES. Non-confirm answers read as NO.
    pub fn is_yes(&self) -> bool {
        matches!(self, Self::Confirmed(true))
    }
}

/// Renders prompts and output for the operator.
///
/// Implemented by the terminal frontend and by the scripted prompter used in
/// tests.
///
/// # Invariants
///
/// - The future returned by [`ask`](Prompter::ask) is cancel-safe: dropping it
///   before completion abandons the prompt without consuming input meant for
///   the next one.
/// - Status lines posted while a prompt is pending are rendered above it
///   without clearing the prompt or the partially typed answer.
pub trait Prompter: Send {
    /// Frontend-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Present a prompt and wait for the answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frontend failed or its input stream ended.
    fn ask(&mut self, prompt: Prompt) -> impl Future<Output = Result<Answer, Self::Error>> + Send;

    /// Print output lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the frontend failed to draw.
    fn show(&mut self, lines: &[Line]) -> Result<(), Self::Error>;
}

/// Sender half for asynchronous status output.
///
/// Cloneable; the [`StatusFeed`] is owned by the prompter.
#[derive(Debug, Clone)]
pub struct StatusLine {
    tx: mpsc::UnboundedSender<Vec<Line>>,
}

/// Receiver half for asynchronous status output.
#[derive(Debug)]
pub struct StatusFeed {
    rx: mpsc::UnboundedReceiver<Vec<Line>>,
}

/// Create a connected status line and feed.
pub fn status_line() -> (StatusLine, StatusFeed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusLine { tx }, StatusFeed { rx })
}

impl StatusLine {
    /// Queue a notice for rendering.
    pub fn post(&self, notice: &Notice) {
        if self.tx.send(notice.lines()).is_err() {
            tracing::debug!(?notice, "status feed closed, dropping notice");
        }
    }
}

impl StatusFeed {
    /// Wait for the next batch of status lines.
    ///
    /// Cancel-safe. Returns `None` once every [`StatusLine`] is dropped.
    pub async fn next(&mut self) -> Option<Vec<Line>> {
        self.rx.recv().await
    }

    /// Take the next batch if one is already queued.
    pub fn try_next(&mut self) -> Option<Vec<Line>> {
        self.rx.try_recv().ok()
    }

    /// Take everything already queued, flattened.
    pub fn drain(&mut self) -> Vec<Line> {
        let mut lines = Vec::new();
        while let Some(batch) = self.try_next() {
            lines.extend(batch);
        }
        lines
    }
}

/// Interpret message input. A leading `q` cancels.
pub fn parse_message(input: &str) -> Option<&str> {
    if input.starts_with('q') { None } else { Some(input) }
}

/// Interpret credential id input. Blank input yields `None`.
pub fn parse_credential_id(input: &str) -> Option<CredentialId> {
    let trimmed = input.trim();
    if trimmed.is_empty() { None } else { Some(CredentialId::new(trimmed)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_q_cancels_message() {
        assert_eq!(parse_message("q"), None);
        assert_eq!(parse_message("quit"), None);
        assert_eq!(parse_message("hello"), Some("hello"));
        assert_eq!(parse_message(" q"), Some(" q"));
    }

    #[test]
    fn blank_credential_id_is_rejected() {
        assert_eq!(parse_credential_id(""), None);
        assert_eq!(parse_credential_id("   "), None);
        assert_eq!(parse_credential_id(" abc "), Some(CredentialId::new("abc")));
    }

    #[test]
    fn confirm_offers_yes_then_no() {
        let prompt = Prompt::confirm(CONFIRM);
        assert_eq!(prompt.choices(), vec!["YES", "NO"]);
        assert_eq!(prompt.title(), CONFIRM);
    }

    #[test]
    fn menu_uses_options_title() {
        let prompt = Prompt::menu(["Send message", "Exit"]);
        assert_eq!(prompt.title(), OPTIONS);
        assert_eq!(prompt.choices(), vec!["Send message", "Exit"]);
    }

    #[test]
    fn status_feed_drains_in_order() {
        let (status, mut feed) = status_line();
        status.post(&Notice::ProofAccepted);
        status.post(&Notice::Exit);

        let texts: Vec<String> = feed.drain().iter().map(Line::text).collect();
        assert_eq!(texts, vec!["Proof request accepted!".to_string(), "Exiting...".to_string()]);
        assert!(feed.try_next().is_none());
    }

    #[test]
    fn posting_after_feed_dropped_is_harmless() {
        let (status, feed) = status_line();
        drop(feed);
        status.post(&Notice::Exit);
    }
}
