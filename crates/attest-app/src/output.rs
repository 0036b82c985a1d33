//! Operator-facing output.
//!
//! [`Notice`] enumerates every semantic message the interactive layer can
//! emit. [`Notice::lines`] maps each one to display [`Line`]s tagged with a
//! semantic [`Tone`]; renderers decide what a tone looks like.

use attest_core::{Attribute, CredentialId, CredentialRecord, CredentialSelection, Did};

/// Semantic colour of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    /// Default terminal colour.
    Plain,
    /// Highlighted information (purple).
    Info,
    /// Successful outcome (green).
    Success,
    /// Attention or attribute values (yellow).
    Warning,
    /// Failure (red).
    Error,
}

/// A run of text with a single tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Semantic colour.
    pub tone: Tone,
    /// Text content.
    pub text: String,
}

/// One line of output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    /// Spans in display order.
    pub spans: Vec<Span>,
}

impl Line {
    /// Line with a single styled span.
    pub fn styled(tone: Tone, text: impl Into<String>) -> Self {
        Self { spans: vec![Span { tone, text: text.into() }] }
    }

    /// Line with a single plain span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::styled(Tone::Plain, text)
    }

    /// Empty spacer line.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Append a span.
    #[must_use]
    pub fn with(mut self, tone: Tone, text: impl Into<String>) -> Self {
        self.spans.push(Span { tone, text: text.into() });
        self
    }

    /// Concatenated text without styling.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Everything the interactive layer tells the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Session banner.
    Banner {
        /// Role title.
        title: String,
    },
    /// Connection completed.
    ConnectionEstablished,
    /// Connection dropped by the engine.
    ConnectionLost,
    /// Invitation created; the URL must reach the remote peer.
    InvitationCreated {
        /// Invitation URL.
        url: String,
    },
    /// Waiting for the remote peer to accept an invitation.
    WaitingForConnection,
    /// Inbound plain-text message.
    MessageReceived {
        /// Our agent label.
        name: String,
        /// Message text.
        content: String,
    },
    /// Preview of an offered credential.
    CredentialPreview {
        /// Offered attributes.
        attributes: Vec<Attribute>,
    },
    /// Attributes a proof request would disclose.
    ProofAttributes {
        /// Engine's selection of stored credentials.
        selection: CredentialSelection,
    },
    /// Proof request accepted.
    ProofAccepted,
    /// Verifier finished checking a presentation.
    ProofVerified {
        /// Verification outcome.
        verified: bool,
    },
    /// Stored credentials.
    CredentialListing {
        /// Credentials in display order.
        credentials: Vec<CredentialRecord>,
    },
    /// Credential deleted.
    CredentialRemoved {
        /// Deleted credential.
        id: CredentialId,
    },
    /// Credential could not be deleted.
    CredentialNotRemoved {
        /// Credential that was requested.
        id: CredentialId,
    },
    /// Bulk removal finished.
    AllCredentialsRemoved {
        /// Credentials deleted.
        removed: usize,
        /// Credentials that could not be deleted.
        failed: usize,
    },
    /// Bulk removal found nothing to delete.
    NoCredentialsToRemove,
    /// Credential id input was empty.
    EmptyCredentialId,
    /// Proof request attributes could not be resolved.
    WalletUnavailable,
    /// Issuer DID imported.
    DidImported {
        /// Imported DID.
        did: Did,
    },
    /// Credential offer sent.
    CredentialOffered,
    /// Proof request sent.
    ProofRequested,
    /// An operation failed.
    Failure {
        /// Error description.
        message: String,
    },
    /// Process is exiting.
    Exit,
}

impl Notice {
    /// Display lines for this notice.
    pub fn lines(&self) -> Vec<Line> {
        match self {
            Self::Banner { title } => vec![Line::styled(Tone::Info, format!("== {title} =="))],
            Self::ConnectionEstablished => {
                vec![Line::blank(), Line::styled(Tone::Success, "Connection established!")]
            },
            Self::ConnectionLost => vec![Line::styled(Tone::Error, "Connection lost.")],
            Self::InvitationCreated { url } => vec![
                Line::plain("Invitation created. Share this URL with the holder:"),
                Line::styled(Tone::Info, url.clone()),
            ],
            Self::WaitingForConnection => {
                vec![Line::styled(Tone::Warning, "Waiting for the holder to connect...")]
            },
            Self::MessageReceived { name, content } => {
                vec![Line::styled(Tone::Info, format!("{name} received a message: {content}"))]
            },
            Self::CredentialPreview { attributes } => {
                let mut lines = vec![Line::blank(), Line::plain("Credential preview:")];
                lines.extend(attributes.iter().map(|a| {
                    Line::styled(Tone::Info, a.name.clone()).with(Tone::Plain, format!(" {}", a.value))
                }));
                lines
            },
            Self::ProofAttributes { selection } => proof_attribute_lines(selection),
            Self::ProofAccepted => vec![Line::styled(Tone::Success, "Proof request accepted!")],
            Self::ProofVerified { verified: true } => {
                vec![Line::styled(Tone::Info, "The proof request has been successfully verified!")]
            },
            Self::ProofVerified { verified: false } => {
                vec![Line::styled(Tone::Info, "The proof request could not be verified.")]
            },
            Self::CredentialListing { credentials } => listing_lines(credentials),
            Self::CredentialRemoved { id } => vec![Line::styled(
                Tone::Success,
                format!("Credential with ID {id} removed successfully."),
            )],
            Self::CredentialNotRemoved { id } => {
                vec![Line::styled(Tone::Error, format!("Could not remove credential with ID {id}."))]
            },
            Self::AllCredentialsRemoved { removed, failed: 0 } => {
                vec![Line::styled(Tone::Info, format!("All credentials removed ({removed})."))]
            },
            Self::AllCredentialsRemoved { removed, failed } => vec![Line::styled(
                Tone::Warning,
                format!("Removed {removed} credentials, {failed} could not be removed."),
            )],
            Self::NoCredentialsToRemove => {
                vec![Line::styled(Tone::Warning, "No credentials available to remove.")]
            },
            Self::EmptyCredentialId => vec![
                Line::styled(Tone::Error, "Credential ID cannot be empty!"),
                Line::styled(Tone::Error, "No credential ID provided. Action cancelled."),
            ],
            Self::WalletUnavailable => {
                vec![Line::styled(Tone::Error, "Credential could not be fetched from the wallet!")]
            },
            Self::DidImported { did } => vec![Line::plain(format!("Imported issuer DID {did}"))],
            Self::CredentialOffered => vec![Line::styled(Tone::Success, "Credential offer sent.")],
            Self::ProofRequested => vec![Line::styled(Tone::Success, "Proof request sent.")],
            Self::Failure { message } => vec![Line::styled(Tone::Error, message.clone())],
            Self::Exit => vec![Line::plain("Exiting...")],
        }
    }
}

fn proof_attribute_lines(selection: &CredentialSelection) -> Vec<Line> {
    let mut lines = vec![Line::styled(Tone::Info, "Requested attributes for proof:")];
    if selection.attributes.is_empty() {
        lines.push(Line::styled(Tone::Error, "  No attributes found in the proof request."));
        return lines;
    }

    lines.extend(selection.attributes.iter().map(|attribute| {
        let value = attribute.value.as_deref().unwrap_or("Not Available");
        Line::styled(
            Tone::Warning,
            format!("  - Attribute Name: {}, Credential Value: {value}", attribute.name),
        )
    }));
    lines
}

fn listing_lines(credentials: &[CredentialRecord]) -> Vec<Line> {
    let mut lines = vec![Line::blank(), Line::plain("List of All Credentials:")];
    if credentials.is_empty() {
        lines.push(Line::styled(Tone::Error, "No credentials found."));
        return lines;
    }

    for (index, record) in credentials.iter().enumerate() {
        lines.push(Line::blank());
        lines.push(Line::styled(
            Tone::Success,
            format!("Credential Exchange Record {}:", index + 1),
        ));
        lines.push(Line::styled(Tone::Info, format!("  - Credential Record ID: {}", record.id)));
        if record.attributes.is_empty() {
            lines.push(Line::styled(
                Tone::Error,
                "  - No attributes found in this credential exchange record.",
            ));
        }
        for attribute in &record.attributes {
            lines.push(Line::styled(
                Tone::Warning,
                format!("  - {}: {}", attribute.name, attribute.value),
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use attest_core::{CredentialState, SelectedAttribute};

    use super::*;

    fn texts(notice: &Notice) -> Vec<String> {
        notice.lines().iter().map(Line::text).collect()
    }

    #[test]
    fn empty_listing_says_no_credentials() {
        let lines = texts(&Notice::CredentialListing { credentials: vec![] });
        assert_eq!(lines.last().map(String::as_str), Some("No credentials found."));
    }

    #[test]
    fn listing_numbers_records_from_one() {
        let record = CredentialRecord {
            id: CredentialId::new("cred-7"),
            connection_id: None,
            state: CredentialState::Done,
            attributes: vec![Attribute::new("name", "Alice")],
            created_at: 0,
            updated_at: None,
        };
        let lines = texts(&Notice::CredentialListing { credentials: vec![record] });

        assert!(lines.contains(&"Credential Exchange Record 1:".to_string()));
        assert!(lines.contains(&"  - Credential Record ID: cred-7".to_string()));
        assert!(lines.contains(&"  - name: Alice".to_string()));
    }

    #[test]
    fn missing_proof_value_is_not_available() {
        let selection = CredentialSelection {
            attributes: vec![SelectedAttribute {
                name: "degree".into(),
                credential_id: None,
                value: None,
            }],
        };
        let lines = texts(&Notice::ProofAttributes { selection });
        assert_eq!(lines[1], "  - Attribute Name: degree, Credential Value: Not Available");
    }

    #[test]
    fn message_line_names_receiver() {
        let lines =
            texts(&Notice::MessageReceived { name: "Alice".into(), content: "hi".into() });
        assert_eq!(lines, vec!["Alice received a message: hi".to_string()]);
    }

    #[test]
    fn preview_keeps_attribute_tone_split() {
        let notice = Notice::CredentialPreview { attributes: vec![Attribute::new("age", "30")] };
        let lines = notice.lines();
        let preview = &lines[2];

        assert_eq!(preview.spans[0].tone, Tone::Info);
        assert_eq!(preview.text(), "age 30");
    }
}
