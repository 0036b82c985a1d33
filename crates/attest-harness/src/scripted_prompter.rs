//! Prompter that answers from a script.
//!
//! `ScriptedPrompter` implements [`Prompter`] so the same menu drivers that
//! run on the terminal run in tests. Each scripted step answers one prompt:
//! choose an option by label, type text, confirm, or hold the prompt open
//! until the session abandons it. A step can run a hook when its prompt is
//! shown, which is how tests make remote activity arrive "while the operator
//! is looking at the prompt".
//!
//! Every prompt is recorded in a transcript together with the busy-gate state
//! at the time it was shown and the status lines that arrived while it was
//! pending.

use std::{collections::VecDeque, fmt, time::Duration};

use attest_app::{Answer, Gate, Line, Prompt, Prompter, StatusFeed};
use thiserror::Error;

/// Script ran out of sync with the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// A prompt was shown after the script ran out.
    #[error("script exhausted at prompt {title:?}")]
    Exhausted {
        /// Prompt that had no answer
        title: String,
    },

    /// The prompt title did not match the step's expectation.
    #[error("expected prompt {expected:?}, got {actual:?}")]
    UnexpectedPrompt {
        /// Title the step expected
        expected: String,
        /// Title that was shown
        actual: String,
    },

    /// The scripted label is not among the prompt's choices.
    #[error("no choice {label:?} in prompt {title:?}")]
    UnknownChoice {
        /// Label the step wanted
        label: String,
        /// Prompt that was shown
        title: String,
    },

    /// The scripted reply does not fit the prompt kind.
    #[error("reply does not fit prompt {title:?}")]
    ReplyMismatch {
        /// Prompt that was shown
        title: String,
    },
}

/// How a step answers.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Choose(String),
    Type(String),
    Confirm(bool),
    Hold,
}

type Hook = Box<dyn FnOnce() + Send>;

struct Step {
    reply: Reply,
    expect: Option<String>,
    delay: Duration,
    on_ask: Option<Hook>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("reply", &self.reply)
            .field("expect", &self.expect)
            .field("delay", &self.delay)
            .field("on_ask", &self.on_ask.is_some())
            .finish()
    }
}

/// One prompt as the session showed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// The prompt.
    pub prompt: Prompt,
    /// The answer given. `None` if the session abandoned the prompt.
    pub answer: Option<Answer>,
    /// Whether the busy gate was held when the prompt was shown.
    pub busy: bool,
    /// Status lines that arrived while the prompt was pending.
    pub status: Vec<String>,
}

/// Script-driven [`Prompter`].
#[derive(Debug)]
pub struct ScriptedPrompter {
    script: VecDeque<Step>,
    feed: StatusFeed,
    gate: Option<Gate>,
    transcript: Vec<Exchange>,
    output: Vec<Line>,
}

impl ScriptedPrompter {
    /// Create an empty script reading status lines from `feed`.
    pub fn new(feed: StatusFeed) -> Self {
        Self { script: VecDeque::new(), feed, gate: None, transcript: Vec::new(), output: Vec::new() }
    }

    /// Record the given gate's state with every prompt.
    pub fn watch(&mut self, gate: Gate) {
        self.gate = Some(gate);
    }

    fn push(mut self, reply: Reply) -> Self {
        self.script.push_back(Step { reply, expect: None, delay: Duration::ZERO, on_ask: None });
        self
    }

    /// Choose the option with the given label.
    #[must_use]
    pub fn choose(self, label: impl Into<String>) -> Self {
        self.push(Reply::Choose(label.into()))
    }

    /// Type free text.
    #[must_use]
    pub fn type_text(self, text: impl Into<String>) -> Self {
        self.push(Reply::Type(text.into()))
    }

    /// Answer YES.
    #[must_use]
    pub fn yes(self) -> Self {
        self.push(Reply::Confirm(true))
    }

    /// Answer NO.
    #[must_use]
    pub fn no(self) -> Self {
        self.push(Reply::Confirm(false))
    }

    /// Leave the prompt open until the session abandons it.
    #[must_use]
    pub fn hold(self) -> Self {
        self.push(Reply::Hold)
    }

    fn last_step(&mut self) -> Option<&mut Step> {
        self.script.back_mut()
    }

    /// Require the previous step's prompt to carry this title.
    #[must_use]
    pub fn expecting(mut self, title: impl Into<String>) -> Self {
        if let Some(step) = self.last_step() {
            step.expect = Some(title.into());
        }
        self
    }

    /// Delay the previous step's answer.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        if let Some(step) = self.last_step() {
            step.delay = delay;
        }
        self
    }

    /// Run `hook` when the previous step's prompt is shown.
    #[must_use]
    pub fn on_ask(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        if let Some(step) = self.last_step() {
            step.on_ask = Some(Box::new(hook));
        }
        self
    }

    /// Every prompt shown so far.
    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    /// Titles of every prompt shown so far.
    pub fn titles(&self) -> Vec<&str> {
        self.transcript.iter().map(|e| e.prompt.title()).collect()
    }

    /// Everything printed, status lines included, as plain text.
    pub fn output(&self) -> Vec<String> {
        self.output.iter().map(Line::text).collect()
    }

    /// Whether any printed line equals `text`.
    pub fn printed(&self, text: &str) -> bool {
        self.output.iter().any(|line| line.text() == text)
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn drain_status(&mut self) -> Vec<String> {
        let lines = self.feed.drain();
        let texts = lines.iter().map(Line::text).collect();
        self.output.extend(lines);
        texts
    }
}

fn resolve(reply: Reply, prompt: &Prompt) -> Result<Answer, ScriptError> {
    let title = prompt.title().to_string();
    match (reply, prompt) {
        (Reply::Choose(label), Prompt::Select { options, .. }) => options
            .iter()
            .position(|o| *o == label)
            .map(Answer::Choice)
            .ok_or(ScriptError::UnknownChoice { label, title }),
        (Reply::Type(text), Prompt::Input { .. }) => Ok(Answer::Text(text)),
        (Reply::Confirm(yes), Prompt::Confirm { .. }) => Ok(Answer::Confirmed(yes)),
        _ => Err(ScriptError::ReplyMismatch { title }),
    }
}

impl Prompter for ScriptedPrompter {
    type Error = ScriptError;

    async fn ask(&mut self, prompt: Prompt) -> Result<Answer, Self::Error> {
        self.drain_status();
        let busy = self.gate.as_ref().is_some_and(Gate::is_busy);

        let Some(step) = self.script.pop_front() else {
            return Err(ScriptError::Exhausted { title: prompt.title().to_string() });
        };
        if let Some(expected) = step.expect
            && expected != prompt.title()
        {
            return Err(ScriptError::UnexpectedPrompt {
                expected,
                actual: prompt.title().to_string(),
            });
        }

        let index = self.transcript.len();
        self.transcript.push(Exchange { prompt: prompt.clone(), answer: None, busy, status: Vec::new() });

        if let Some(hook) = step.on_ask {
            hook();
        }
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        if step.reply == Reply::Hold {
            return std::future::pending().await;
        }

        let answer = resolve(step.reply, &prompt)?;
        let status = self.drain_status();
        if let Some(exchange) = self.transcript.get_mut(index) {
            exchange.status = status;
            exchange.answer = Some(answer.clone());
        }
        Ok(answer)
    }

    fn show(&mut self, lines: &[Line]) -> Result<(), Self::Error> {
        self.drain_status();
        self.output.extend_from_slice(lines);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use attest_app::{Notice, status_line};

    use super::*;

    #[tokio::test]
    async fn answers_in_script_order() {
        let (_status, feed) = status_line();
        let mut prompter = ScriptedPrompter::new(feed).choose("Exit").yes();

        let menu = prompter.ask(Prompt::menu(["Restart", "Exit"])).await;
        assert_eq!(menu, Ok(Answer::Choice(1)));
        let confirm = prompter.ask(Prompt::confirm("Are you sure?")).await;
        assert_eq!(confirm, Ok(Answer::Confirmed(true)));
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn unknown_label_is_reported() {
        let (_status, feed) = status_line();
        let mut prompter = ScriptedPrompter::new(feed).choose("Fly");

        let result = prompter.ask(Prompt::menu(["Exit"])).await;
        assert!(matches!(result, Err(ScriptError::UnknownChoice { .. })));
    }

    #[tokio::test]
    async fn title_expectation_is_enforced() {
        let (_status, feed) = status_line();
        let mut prompter = ScriptedPrompter::new(feed).yes().expecting("Are you sure?");

        let result = prompter.ask(Prompt::confirm("Something else?")).await;
        assert!(matches!(result, Err(ScriptError::UnexpectedPrompt { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn status_during_delay_is_attributed_to_prompt() {
        let (status, feed) = status_line();
        let hook_status = status.clone();
        let mut prompter = ScriptedPrompter::new(feed)
            .type_text("hello")
            .after(Duration::from_millis(10))
            .on_ask(move || hook_status.post(&Notice::ProofAccepted));

        prompter.ask(Prompt::input("Say something")).await.unwrap();

        let exchange = &prompter.transcript()[0];
        assert_eq!(exchange.status, vec!["Proof request accepted!".to_string()]);
        assert!(prompter.printed("Proof request accepted!"));
    }

    #[tokio::test]
    async fn exhausted_script_errors() {
        let (_status, feed) = status_line();
        let mut prompter = ScriptedPrompter::new(feed);

        let result = prompter.ask(Prompt::input("Anything?")).await;
        assert_eq!(result, Err(ScriptError::Exhausted { title: "Anything?".into() }));
    }
}
