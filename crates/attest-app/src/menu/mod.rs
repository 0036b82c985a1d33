//! Role menu drivers.
//!
//! A driver owns its role's agent facade and [`Console`](crate::Console) and
//! runs the interaction loop: queued sub-dialogs first, then one top-level
//! menu round. Each round re-evaluates which options are available from the
//! agent's session state.

mod holder;
mod issuer;

pub use holder::{HolderAction, HolderMenu};
pub use issuer::{IssuerAction, IssuerMenu};

use crate::prompt::Prompt;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Operator asked for a fresh engine and session.
    Restart,
    /// Operator asked to quit the process.
    Quit,
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep looping.
    Continue,
    /// Session is over.
    Exit(Exit),
}

/// Menu prompt over the given actions.
fn menu_prompt<A: Copy>(actions: &[A], label: fn(A) -> &'static str) -> Prompt {
    Prompt::menu(actions.iter().map(|a| label(*a)))
}

/// Resolve a menu answer to an action.
fn chosen<A: Copy>(actions: &[A], index: Option<usize>) -> Option<A> {
    let action = index.and_then(|i| actions.get(i).copied());
    if action.is_none() {
        tracing::warn!(?index, options = actions.len(), "menu answer out of range");
    }
    action
}
