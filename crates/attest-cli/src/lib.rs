//! Terminal front-end for the attest credential exchange agent.
//!
//! A thin shell over [`attest_app`] that provides terminal-specific I/O. All
//! menu and event logic lives in the app crate; this crate renders prompts,
//! reads keys and prints output.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod input;
pub mod session;
pub mod terminal;
pub mod ui;

pub use input::{KeyInput, PromptState};
pub use session::{Role, SessionOptions};
pub use terminal::{TerminalError, TerminalPrompter};
