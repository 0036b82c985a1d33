//! Issuer/verifier sessions driven end to end.

use std::time::Duration;

use attest_app::{AgentConfig, Exit, IssuerAction, IssuerAgent, IssuerMenu, prompt, status_line};
use attest_core::{CredentialState, Registry};
use attest_harness::{
    Call, Counterparty, Fault, InvariantRegistry, ScriptedPrompter, SessionSnapshot, SimEngine,
};

type Session = IssuerMenu<SimEngine, ScriptedPrompter>;

/// Build an issuer session named "Faber" whose prompter records the gate.
fn issuer(engine: &SimEngine, script: impl FnOnce(ScriptedPrompter) -> ScriptedPrompter) -> Session {
    let (status, feed) = status_line();
    let prompter = script(ScriptedPrompter::new(feed));
    let agent = IssuerAgent::new(engine.clone(), AgentConfig::with_label("Faber"));
    let mut menu = IssuerMenu::new(agent, prompter, status);
    let gate = menu.console().gate();
    menu.console_mut().prompter_mut().watch(gate);
    menu
}

fn quit(script: ScriptedPrompter) -> ScriptedPrompter {
    script.choose(IssuerAction::Exit.label()).yes().expecting(prompt::CONFIRM)
}

fn check_invariants(menu: &Session, context: &str) {
    InvariantRegistry::standard().assert_all(&SessionSnapshot::capture(menu.console()), context);
}

/// Let a peer with no simulated behavior accept the next invitation.
fn accept_next_invitation(engine: &SimEngine) {
    let peer = engine.clone();
    tokio::spawn(async move {
        while peer.connect_peer("Alice").is_none() {
            tokio::task::yield_now().await;
        }
    });
}

#[tokio::test]
async fn menu_is_reduced_until_an_invitation_exists() {
    let engine = SimEngine::new();

    let mut menu = issuer(&engine, |s| {
        quit(s.choose(IssuerAction::Exit.label()).no().expecting(prompt::CONFIRM))
    });

    assert_eq!(menu.run().await.unwrap(), Exit::Quit);

    let prompter = menu.console().prompter();
    let first = &prompter.transcript()[0];
    assert_eq!(first.prompt.choices(), vec!["Create connection invitation", "Restart", "Exit"]);
    assert!(prompter.printed("== Faber (issuer) =="));
    assert!(prompter.printed("Exiting..."));
    assert!(engine.is_shut_down());
}

#[tokio::test]
async fn invitation_is_shown_and_connection_awaited() {
    let engine = SimEngine::new().with_counterparty(Counterparty::new("Alice"));

    let mut menu = issuer(&engine, |s| quit(s.choose(IssuerAction::CreateConnection.label())));
    menu.run().await.unwrap();

    let prompter = menu.console().prompter();
    let output = prompter.output();
    let share = output
        .iter()
        .position(|line| line == "Invitation created. Share this URL with the holder:")
        .unwrap();
    assert!(output[share + 1].starts_with("https://attest.invalid/invite?oob="));
    assert!(prompter.printed("Waiting for the holder to connect..."));
    assert!(prompter.printed("Connection established!"));
    assert!(menu.agent().state().session.is_connected());
    assert_eq!(prompter.transcript()[1].prompt.choices().len(), IssuerAction::ALL.len());
}

#[tokio::test]
async fn offer_imports_did_and_waits_for_acknowledgement() {
    let engine = SimEngine::new().with_counterparty(Counterparty::new("Alice"));

    let mut menu = issuer(&engine, |s| {
        let s = s
            .choose(IssuerAction::CreateConnection.label())
            .choose(IssuerAction::OfferCredential.label())
            .choose("cheqd")
            .expecting(prompt::REGISTRY)
            .yes()
            .expecting(prompt::OFFER_RECEIVED);
        quit(s)
    });

    menu.run().await.unwrap();

    let calls = engine.calls();
    assert!(calls.contains(&Call::ImportDid(Registry::Cheqd)));
    assert!(calls.iter().any(|c| matches!(c, Call::OfferCredential(_))));

    let prompter = menu.console().prompter();
    assert!(prompter.output().iter().any(|l| l.starts_with("Imported issuer DID did:cheqd:")));
    assert!(prompter.printed("Credential offer sent."));

    let acknowledgement = prompter
        .transcript()
        .iter()
        .find(|e| e.prompt.title() == prompt::OFFER_RECEIVED)
        .unwrap();
    assert!(acknowledgement.busy);

    let offered = engine.credential_records();
    assert_eq!(offered.len(), 1);
    assert_eq!(offered[0].attributes, AgentConfig::default().credential.attributes);
    check_invariants(&menu, "after offering");
}

#[tokio::test(start_paused = true)]
async fn counterparty_completes_issuance() {
    let engine = SimEngine::new().with_counterparty(Counterparty::new("Alice"));

    let mut menu = issuer(&engine, |s| {
        let s = s
            .choose(IssuerAction::CreateConnection.label())
            .choose(IssuerAction::OfferCredential.label())
            .choose("indy")
            .no()
            .expecting(prompt::OFFER_RECEIVED)
            .after(Duration::from_millis(10));
        quit(s)
    });

    menu.run().await.unwrap();

    let states: Vec<_> = engine.credential_records().iter().map(|c| c.state).collect();
    assert_eq!(states, vec![CredentialState::Done]);
}

#[tokio::test]
async fn rejected_did_import_skips_the_offer() {
    let engine = SimEngine::new().with_counterparty(Counterparty::new("Alice"));
    engine.fail(Fault::DidImportRejected);

    let mut menu = issuer(&engine, |s| {
        quit(
            s.choose(IssuerAction::CreateConnection.label())
                .choose(IssuerAction::OfferCredential.label())
                .choose("indy"),
        )
    });

    assert_eq!(menu.run().await.unwrap(), Exit::Quit);

    let prompter = menu.console().prompter();
    assert!(prompter.printed("import DID failed: rejected: indy registry unavailable"));
    assert!(!prompter.titles().contains(&prompt::OFFER_RECEIVED));
    assert!(!engine.calls().iter().any(|c| matches!(c, Call::OfferCredential(_))));
    check_invariants(&menu, "after a rejected import");
}

#[tokio::test(start_paused = true)]
async fn verified_proof_outcome_arrives_during_acknowledgement() {
    let engine = SimEngine::new()
        .with_counterparty(Counterparty::new("Alice").with_latency(Duration::from_millis(50)));

    let mut menu = issuer(&engine, |s| {
        let s = s
            .choose(IssuerAction::CreateConnection.label())
            .choose(IssuerAction::RequestProof.label())
            .yes()
            .expecting(prompt::PROOF_RECEIVED)
            .after(Duration::from_millis(100));
        quit(s)
    });

    menu.run().await.unwrap();

    let prompter = menu.console().prompter();
    assert!(prompter.printed("Proof request sent."));
    let acknowledgement = prompter
        .transcript()
        .iter()
        .find(|e| e.prompt.title() == prompt::PROOF_RECEIVED)
        .unwrap();
    assert!(acknowledgement.busy);
    assert_eq!(
        acknowledgement.status,
        vec!["The proof request has been successfully verified!".to_string()]
    );

    // Messages and connection loss remain; the one-shot outcome is gone.
    assert_eq!(menu.console().listener().subscription_count(), 2);
    check_invariants(&menu, "after a verified proof");
}

#[tokio::test(start_paused = true)]
async fn unverifiable_proof_is_reported() {
    let engine = SimEngine::new().with_counterparty(
        Counterparty::new("Alice").with_latency(Duration::from_millis(50)).unverifiable(),
    );

    let mut menu = issuer(&engine, |s| {
        let s = s
            .choose(IssuerAction::CreateConnection.label())
            .choose(IssuerAction::RequestProof.label())
            .yes()
            .expecting(prompt::PROOF_RECEIVED);
        s.choose(IssuerAction::Exit.label())
            .after(Duration::from_millis(100))
            .yes()
            .expecting(prompt::CONFIRM)
    });

    menu.run().await.unwrap();

    let prompter = menu.console().prompter();
    assert!(prompter.printed("The proof request could not be verified."));
    assert!(!prompter.printed("The proof request has been successfully verified!"));
}

#[tokio::test]
async fn unanswered_requests_each_keep_their_outcome_subscription() {
    let engine = SimEngine::new();
    accept_next_invitation(&engine);

    let mut menu = issuer(&engine, |s| {
        let s = s
            .choose(IssuerAction::CreateConnection.label())
            .choose(IssuerAction::RequestProof.label())
            .yes()
            .choose(IssuerAction::RequestProof.label())
            .yes();
        quit(s)
    });

    menu.run().await.unwrap();

    let requests = engine.calls().iter().filter(|c| matches!(c, Call::RequestProof(_))).count();
    assert_eq!(requests, 2);
    // Messages, connection loss and one outcome per request.
    assert_eq!(menu.console().listener().subscription_count(), 4);
    check_invariants(&menu, "after two proof requests");
}

#[tokio::test(start_paused = true)]
async fn outcomes_of_requests_in_flight_are_all_printed() {
    let engine = SimEngine::new()
        .with_counterparty(Counterparty::new("Alice").with_latency(Duration::from_millis(50)));

    let mut menu = issuer(&engine, |s| {
        let s = s
            .choose(IssuerAction::CreateConnection.label())
            .choose(IssuerAction::RequestProof.label())
            .yes()
            .expecting(prompt::PROOF_RECEIVED)
            .choose(IssuerAction::RequestProof.label())
            .yes()
            .expecting(prompt::PROOF_RECEIVED);
        s.choose(IssuerAction::Exit.label())
            .after(Duration::from_millis(500))
            .yes()
            .expecting(prompt::CONFIRM)
    });

    menu.run().await.unwrap();

    let output = menu.console().prompter().output();
    let sent = output.iter().filter(|l| *l == "Proof request sent.").count();
    let verified = output
        .iter()
        .filter(|l| *l == "The proof request has been successfully verified!")
        .count();
    assert_eq!(sent, 2);
    assert_eq!(verified, 2);

    assert_eq!(menu.console().listener().subscription_count(), 2);
    check_invariants(&menu, "after two verified proofs");
}

#[tokio::test(start_paused = true)]
async fn echoed_message_is_printed_with_own_name() {
    let engine = SimEngine::new().with_counterparty(Counterparty::new("Alice").echoing());

    let mut menu = issuer(&engine, |s| {
        s.choose(IssuerAction::CreateConnection.label())
            .choose(IssuerAction::SendMessage.label())
            .type_text("hello")
            .expecting(prompt::MESSAGE)
            .choose(IssuerAction::Exit.label())
            .after(Duration::from_millis(10))
            .yes()
    });

    menu.run().await.unwrap();

    assert_eq!(engine.sent_messages(), vec!["hello".to_string()]);
    assert!(menu.console().prompter().printed("Faber received a message: echo: hello"));
}
