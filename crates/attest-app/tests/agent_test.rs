//! Agent facades against the simulated engine, without a prompter.

use attest_app::{AgentConfig, AgentError, HolderAgent, IssuerAgent, RemovalSummary};
use attest_core::{Attribute, CredentialId, EngineError, Registry};
use attest_harness::{Counterparty, Fault, SimEngine};

const INVITE: &str = "https://attest.invalid/invite?oob=faber";

fn holder(engine: &SimEngine) -> HolderAgent<SimEngine> {
    HolderAgent::new(engine.clone(), "Alice")
}

#[tokio::test]
async fn message_needs_an_active_connection() {
    let engine = SimEngine::new();
    let agent = holder(&engine);

    assert_eq!(agent.send_message("hi").await, Err(AgentError::NoActiveConnection));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn vanished_connection_record_is_reported() {
    let engine = SimEngine::new();
    let mut agent = holder(&engine);
    agent.accept_connection(INVITE).await.unwrap();

    engine.fail(Fault::ConnectionRecordMissing);
    assert_eq!(agent.send_message("hi").await, Err(AgentError::MissingConnectionRecord));
    assert!(engine.sent_messages().is_empty());
}

#[tokio::test]
async fn accepted_connection_becomes_active() {
    let engine = SimEngine::new();
    let mut agent = holder(&engine);

    let id = agent.accept_connection(INVITE).await.unwrap();
    assert_eq!(agent.state().active_connection(), Some(&id));

    agent.send_message("hi").await.unwrap();
    assert_eq!(engine.sent_messages(), vec!["hi".to_string()]);
}

#[tokio::test]
async fn empty_invitation_is_invalid() {
    let engine = SimEngine::new();
    engine.fail(Fault::EmptyInvitation);
    let mut agent = holder(&engine);

    let result = agent.accept_connection(INVITE).await;
    assert!(matches!(result, Err(AgentError::InvalidInvitation { .. })));
    assert!(!agent.state().is_connected());
}

#[tokio::test]
async fn malformed_invitation_keeps_engine_reason() {
    let engine = SimEngine::new();
    let mut agent = holder(&engine);

    let result = agent.accept_connection("https://attest.invalid/invite?other=1").await;
    assert_eq!(
        result,
        Err(AgentError::InvalidInvitation { reason: "missing oob parameter".to_string() })
    );
}

#[tokio::test]
async fn lost_connection_clears_only_the_active_one() {
    let engine = SimEngine::new();
    let mut agent = holder(&engine);
    let id = agent.accept_connection(INVITE).await.unwrap();

    assert!(!agent.connection_lost(&attest_core::ConnectionId::new("someone-else")));
    assert!(agent.state().is_connected());
    assert!(agent.connection_lost(&id));
    assert!(!agent.state().is_connected());
}

#[tokio::test]
async fn listing_is_fail_soft() {
    let engine = SimEngine::new();
    engine.store_credential(vec![Attribute::new("name", "Alice")], Some(1));
    let agent = holder(&engine);

    assert_eq!(agent.list_credentials().await.len(), 1);
    engine.fail(Fault::WalletUnavailable);
    assert!(agent.list_credentials().await.is_empty());
}

#[tokio::test]
async fn removal_reports_engine_refusal() {
    let engine = SimEngine::new();
    let id = engine.store_credential(vec![], Some(1));
    let agent = holder(&engine);

    assert!(agent.remove_credential(&id).await);
    assert!(!agent.remove_credential(&id).await);
}

#[tokio::test]
async fn removing_unknown_id_leaves_listing_unchanged() {
    let engine = SimEngine::new();
    engine.store_credential(vec![Attribute::new("name", "Alice")], Some(2));
    engine.store_credential(vec![Attribute::new("degree", "Maths")], Some(1));
    let agent = holder(&engine);
    let before = agent.list_credentials().await;
    assert_eq!(before.len(), 2);

    assert!(!agent.remove_credential(&CredentialId::new("nope")).await);
    assert_eq!(agent.list_credentials().await, before);
}

#[tokio::test]
async fn remove_all_counts_failures() {
    let engine = SimEngine::new();
    engine.store_credential(vec![], Some(1));
    engine.store_credential(vec![], Some(2));
    let agent = holder(&engine);

    engine.fail(Fault::DeleteRejected);
    assert_eq!(agent.remove_all_credentials().await, RemovalSummary { removed: 0, failed: 2 });

    engine.heal(Fault::DeleteRejected);
    assert_eq!(agent.remove_all_credentials().await, RemovalSummary { removed: 2, failed: 0 });
    assert!(agent.remove_all_credentials().await.is_empty());
}

#[tokio::test]
async fn declining_twice_is_an_engine_error() {
    let engine = SimEngine::new();
    let id = engine.offer(vec![Attribute::new("name", "Alice")]);
    let agent = holder(&engine);

    agent.decline_credential_offer(&id).await.unwrap();
    let err = agent.decline_credential_offer(&id).await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::EngineOperationFailed {
            operation: "decline credential offer",
            source: EngineError::InvalidState { .. },
        }
    ));
}

#[tokio::test]
async fn issuer_needs_connection_to_offer_or_request() {
    let engine = SimEngine::new();
    let agent = IssuerAgent::new(engine.clone(), AgentConfig::default());

    assert_eq!(agent.offer_credential().await.map(drop), Err(AgentError::NoActiveConnection));
    assert_eq!(agent.request_proof().await.map(drop), Err(AgentError::NoActiveConnection));
    assert_eq!(agent.send_message("hi").await, Err(AgentError::NoActiveConnection));
}

#[tokio::test]
async fn issuer_waits_only_for_its_own_invitation() {
    let engine = SimEngine::new();
    let mut agent = IssuerAgent::new(engine.clone(), AgentConfig::default());

    assert_eq!(agent.await_connection().await, Err(AgentError::MissingConnectionRecord));
}

#[tokio::test]
async fn issuer_offer_needs_a_did() {
    let engine = SimEngine::new().with_counterparty(Counterparty::new("Alice"));
    let mut agent = IssuerAgent::new(engine.clone(), AgentConfig::with_label("Faber"));
    agent.create_invitation().await.unwrap();
    agent.await_connection().await.unwrap();

    let err = agent.offer_credential().await.unwrap_err();
    assert!(matches!(err, AgentError::EngineOperationFailed { operation: "offer credential", .. }));

    let did = agent.import_did(Registry::Indy).await.unwrap();
    assert!(did.as_str().starts_with("did:indy:"));
    assert_eq!(agent.state().did.as_ref(), Some(&did));

    let record = agent.offer_credential().await.unwrap();
    assert_eq!(record.connection_id.as_ref(), agent.state().session.active_connection());
}
