//! The simulated issuing peer drives a holder session on its own.
//!
//! This is the setup the terminal demo runs: after the holder connects, the
//! peer offers a credential and, once it is stored, asks for a proof of it.

use std::time::Duration;

use attest_app::{AgentConfig, HolderAction, HolderAgent, HolderMenu, prompt, status_line};
use attest_core::{CredentialState, OutOfBandId, ProofState};
use attest_harness::{
    Call, Counterparty, InvariantRegistry, ScriptedPrompter, SessionSnapshot, SimEngine,
    invitation_url,
};

#[tokio::test(start_paused = true)]
async fn peer_offers_then_requests_proof() {
    let config = AgentConfig::default();
    let engine = SimEngine::new().with_counterparty(
        Counterparty::issuer("Faber", config.credential.clone(), config.proof.clone())
            .with_latency(Duration::from_millis(10)),
    );

    let (status, feed) = status_line();
    let script = ScriptedPrompter::new(feed)
        .choose(HolderAction::ReceiveInvitation.label())
        .type_text(invitation_url(&OutOfBandId::new("demo")))
        .expecting(prompt::INVITATION_URL)
        .hold()
        .yes()
        .expecting(prompt::CREDENTIAL_OFFER)
        .hold()
        .yes()
        .expecting(prompt::PROOF_REQUEST)
        .choose(HolderAction::Exit.label())
        .yes()
        .expecting(prompt::CONFIRM);

    let mut menu = HolderMenu::new(HolderAgent::new(engine.clone(), "Alice"), script, status);
    let gate = menu.console().gate();
    menu.console_mut().prompter_mut().watch(gate);
    menu.run().await.unwrap();

    let records = engine.credential_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, CredentialState::Done);
    assert_eq!(records[0].attributes, config.credential.attributes);

    let presented: Vec<_> = engine
        .calls()
        .iter()
        .filter_map(|call| match call {
            Call::AcceptRequest(id) => engine.proof(id).map(|p| p.state),
            _ => None,
        })
        .collect();
    assert_eq!(presented, vec![ProofState::Done]);

    let prompter = menu.console().prompter();
    assert!(prompter.printed("Proof request accepted!"));
    assert_eq!(prompter.remaining(), 0);
    InvariantRegistry::standard()
        .assert_all(&SessionSnapshot::capture(menu.console()), "after the demo exchange");
}
