//! Property-based tests for the busy gate and dialog queue.
//!
//! Arbitrary bursts of offers, proof requests and messages arrive while the
//! holder looks at the menu. Whatever the mix and the operator's answers,
//! every dialog runs exactly once, in arrival order, under the gate.

use std::time::Duration;

use attest_app::{HolderAction, HolderAgent, HolderMenu, prompt, status_line};
use attest_core::{Attribute, CredentialState, ProofState};
use attest_harness::{Call, InvariantRegistry, ScriptedPrompter, SessionSnapshot, SimEngine};
use proptest::prelude::*;

const INVITE: &str = "https://attest.invalid/invite?oob=faber";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrival {
    Offer,
    ProofRequest,
    Message,
}

impl Arrival {
    fn dialog_title(self) -> Option<&'static str> {
        match self {
            Self::Offer => Some(prompt::CREDENTIAL_OFFER),
            Self::ProofRequest => Some(prompt::PROOF_REQUEST),
            Self::Message => None,
        }
    }
}

fn arrival_strategy() -> impl Strategy<Value = Arrival> {
    prop_oneof![
        2 => Just(Arrival::Offer),
        2 => Just(Arrival::ProofRequest),
        1 => Just(Arrival::Message),
    ]
}

type Session = HolderMenu<SimEngine, ScriptedPrompter>;

/// Run one holder session in which `burst` arrives during the first menu.
fn run_burst(burst: &[(Arrival, bool)]) -> (SimEngine, Session) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async {
        let engine = SimEngine::with_seed(3);
        engine.store_credential(vec![Attribute::new("name", "Alice Smith")], Some(1));

        let (status, feed) = status_line();
        let peer = engine.clone();
        let arrivals: Vec<Arrival> = burst.iter().map(|(a, _)| *a).collect();
        let inject = move || {
            for (index, arrival) in arrivals.into_iter().enumerate() {
                match arrival {
                    Arrival::Offer => {
                        peer.offer(vec![Attribute::new("name", format!("offer {index}"))]);
                    },
                    Arrival::ProofRequest => {
                        peer.receive_proof_request(&["name"]);
                    },
                    Arrival::Message => {
                        peer.deliver_message(format!("m{index}"));
                    },
                }
            }
        };

        let mut script = ScriptedPrompter::new(feed)
            .choose(HolderAction::ReceiveInvitation.label())
            .type_text(INVITE);
        script = if burst.iter().any(|(a, _)| a.dialog_title().is_some()) {
            script.hold().on_ask(inject)
        } else {
            script
                .choose(HolderAction::ListCredentials.label())
                .after(Duration::from_millis(1))
                .on_ask(inject)
        };
        for (arrival, yes) in burst {
            if let Some(title) = arrival.dialog_title() {
                script = (if *yes { script.yes() } else { script.no() }).expecting(title);
            }
        }
        script = script.choose(HolderAction::Exit.label()).yes().expecting(prompt::CONFIRM);

        let mut menu = HolderMenu::new(HolderAgent::new(engine.clone(), "Alice"), script, status);
        let gate = menu.console().gate();
        menu.console_mut().prompter_mut().watch(gate);
        menu.run().await.unwrap();
        (engine, menu)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_dialog_runs_once_in_order(
        burst in prop::collection::vec((arrival_strategy(), any::<bool>()), 1..8)
    ) {
        let (_engine, menu) = run_burst(&burst);
        let prompter = menu.console().prompter();

        let expected: Vec<&str> = burst.iter().filter_map(|(a, _)| a.dialog_title()).collect();
        let shown: Vec<&str> = prompter
            .titles()
            .into_iter()
            .filter(|t| *t == prompt::CREDENTIAL_OFFER || *t == prompt::PROOF_REQUEST)
            .collect();
        prop_assert_eq!(shown, expected);
        prop_assert_eq!(prompter.remaining(), 0);

        let snapshot = SessionSnapshot::capture(menu.console());
        prop_assert!(InvariantRegistry::standard().check_all(&snapshot).is_ok());
        prop_assert_eq!(snapshot.pending_dialogs, 0);
    }

    #[test]
    fn prop_every_arrival_is_resolved(
        burst in prop::collection::vec((arrival_strategy(), any::<bool>()), 1..8)
    ) {
        let (engine, menu) = run_burst(&burst);

        let unresolved_offers = engine
            .credential_records()
            .iter()
            .filter(|c| c.state == CredentialState::OfferReceived)
            .count();
        prop_assert_eq!(unresolved_offers, 0);

        for (index, (arrival, _)) in burst.iter().enumerate() {
            if *arrival == Arrival::Message {
                let line = format!("Alice received a message: m{index}");
                prop_assert!(menu.console().prompter().printed(&line));
            }
        }

        let accepted = burst.iter().filter(|(a, yes)| *a == Arrival::Offer && *yes).count();
        let stored = engine
            .credential_records()
            .iter()
            .filter(|c| c.state == CredentialState::Done && c.connection_id.is_some())
            .count();
        prop_assert_eq!(stored, accepted);

        let proofs_waiting = burst.iter().filter(|(a, _)| *a == Arrival::ProofRequest).count();
        let proof_states: Vec<ProofState> = engine
            .calls()
            .iter()
            .filter_map(|call| match call {
                Call::AcceptRequest(id) | Call::DeclineRequest(id) => {
                    engine.proof(id).map(|p| p.state)
                },
                _ => None,
            })
            .collect();
        prop_assert_eq!(proof_states.len(), proofs_waiting);
        prop_assert!(proof_states.iter().all(|s| *s == ProofState::Done || *s == ProofState::Declined));
    }
}
