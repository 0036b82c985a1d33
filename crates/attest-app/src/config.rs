//! Agent configuration.

use attest_core::{Attribute, CredentialOffer, ProofRequest};

/// Label used when none is configured.
pub const DEFAULT_LABEL: &str = "attest-agent";

/// Static configuration for one agent.
///
/// The credential and proof templates are only used by the issuer role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Agent label, shown to peers and in status lines.
    pub label: String,
    /// Attributes offered by "Offer credential".
    pub credential: CredentialOffer,
    /// Attributes requested by "Request proof".
    pub proof: ProofRequest,
}

impl AgentConfig {
    /// Default configuration with the given label.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self { label: label.into(), ..Self::default() }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            credential: CredentialOffer {
                attributes: vec![
                    Attribute::new("name", "Alice Smith"),
                    Attribute::new("degree", "Computer Science"),
                    Attribute::new("date", "01/01/2022"),
                ],
            },
            proof: ProofRequest { attributes: vec!["name".to_string(), "degree".to_string()] },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_template_requests_offered_attributes() {
        let config = AgentConfig::with_label("Faber");
        assert_eq!(config.label, "Faber");

        let offered: Vec<&str> =
            config.credential.attributes.iter().map(|a| a.name.as_str()).collect();
        assert!(config.proof.attributes.iter().all(|name| offered.contains(&name.as_str())));
    }
}
