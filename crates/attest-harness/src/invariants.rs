//! Invariant checking over session transcripts.
//!
//! Invariants are properties that must hold for every interaction, whatever
//! the script. A [`SessionSnapshot`] captures the observable state of a
//! session (its prompt transcript, gate and dialog queue) and registered
//! [`Invariant`]s are checked against it.
//!
//! # Usage
//!
//! ```ignore
//! let snapshot = SessionSnapshot::capture(menu.console());
//! InvariantRegistry::standard().assert_all(&snapshot, "after offer dialog");
//! ```

use attest_app::{Answer, Console, prompt};

use crate::scripted_prompter::{Exchange, ScriptedPrompter};

/// Titles of prompts that only appear inside a gated dialog.
const DIALOG_TITLES: [&str; 4] =
    [prompt::CREDENTIAL_OFFER, prompt::PROOF_REQUEST, prompt::OFFER_RECEIVED, prompt::PROOF_RECEIVED];

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// Observable state of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Every prompt shown so far.
    pub exchanges: Vec<Exchange>,
    /// Whether the busy gate is held right now.
    pub busy: bool,
    /// Dialogs waiting for the gate.
    pub pending_dialogs: usize,
}

impl SessionSnapshot {
    /// Capture a session driven by a [`ScriptedPrompter`].
    pub fn capture(console: &Console<ScriptedPrompter>) -> Self {
        Self {
            exchanges: console.prompter().transcript().to_vec(),
            busy: console.is_busy(),
            pending_dialogs: console.listener().pending(),
        }
    }
}

/// A property checked against a [`SessionSnapshot`].
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the snapshot.
    fn check(&self, state: &SessionSnapshot) -> InvariantResult;
}

/// The top-level menu is never shown while a dialog holds the gate.
pub struct MenuOnlyWhenIdle;

impl Invariant for MenuOnlyWhenIdle {
    fn name(&self) -> &'static str {
        "menu_only_when_idle"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        match state.exchanges.iter().position(|e| e.prompt.title() == prompt::OPTIONS && e.busy) {
            Some(index) => Err(Violation {
                invariant: self.name(),
                message: format!("menu prompt #{index} shown while busy"),
            }),
            None => Ok(()),
        }
    }
}

/// Dialog prompts are only shown while the gate is held.
pub struct DialogsHoldGate;

impl Invariant for DialogsHoldGate {
    fn name(&self) -> &'static str {
        "dialogs_hold_gate"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for (index, exchange) in state.exchanges.iter().enumerate() {
            let title = exchange.prompt.title();
            if DIALOG_TITLES.contains(&title) && !exchange.busy {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("dialog prompt #{index} {title:?} shown while idle"),
                });
            }
        }
        Ok(())
    }
}

/// Between steps the gate is released.
pub struct GateReleasedAtRest;

impl Invariant for GateReleasedAtRest {
    fn name(&self) -> &'static str {
        "gate_released_at_rest"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.busy {
            return Err(Violation {
                invariant: self.name(),
                message: "busy gate still held after the step returned".to_string(),
            });
        }
        Ok(())
    }
}

/// Selection answers always index into the prompt's choices.
pub struct ChoicesInRange;

impl Invariant for ChoicesInRange {
    fn name(&self) -> &'static str {
        "choices_in_range"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for exchange in &state.exchanges {
            if let Some(Answer::Choice(index)) = exchange.answer {
                let count = exchange.prompt.choices().len();
                if index >= count {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "choice {index} out of {count} in {:?}",
                            exchange.prompt.title()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Only the top-level menu is ever abandoned.
///
/// A dialog or input prompt left unanswered means a second prompt replaced
/// it while it was still pending.
pub struct OnlyMenusAbandoned;

impl Invariant for OnlyMenusAbandoned {
    fn name(&self) -> &'static str {
        "only_menus_abandoned"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        // The final prompt may still be pending when the snapshot is taken.
        let Some((_, earlier)) = state.exchanges.split_last() else {
            return Ok(());
        };
        for (index, exchange) in earlier.iter().enumerate() {
            let title = exchange.prompt.title();
            if exchange.answer.is_none() && title != prompt::OPTIONS {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("prompt #{index} {title:?} abandoned before it was answered"),
                });
            }
        }
        Ok(())
    }
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with every standard session invariant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(MenuOnlyWhenIdle);
        registry.add(DialogsHoldGate);
        registry.add(GateReleasedAtRest);
        registry.add(ChoicesInRange);
        registry.add(OnlyMenusAbandoned);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants, collecting every violation.
    pub fn check_all(&self, state: &SessionSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with context on violation.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SessionSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
