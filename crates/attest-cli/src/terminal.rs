//! Terminal prompter.
//!
//! Implements [`Prompter`] for an interactive terminal using crossterm for
//! keyboard events and ratatui for rendering. The prompt lives in a small
//! inline viewport at the bottom of the screen; output and status lines are
//! inserted above it into the normal scrollback, so the transcript survives
//! after the process exits.

use std::io::{self, Stdout, stdout};

use attest_app::{Answer, Line, Prompt, Prompter, StatusFeed, Tone};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{
    Terminal, TerminalOptions, Viewport,
    backend::CrosstermBackend,
    text::Text,
    widgets::{Paragraph, Widget, Wrap},
};
use thiserror::Error;

use crate::{
    input::{KeyInput, PromptState},
    ui,
};

/// Rows reserved for the prompt viewport.
const VIEWPORT_HEIGHT: u16 = 12;

/// Terminal prompter errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operator pressed Ctrl-C.
    #[error("interrupted")]
    Interrupted,

    /// Terminal event stream ended.
    #[error("terminal input closed")]
    InputClosed,
}

/// What woke the prompt loop.
enum Wake {
    Status(Option<Vec<Line>>),
    Terminal(Option<io::Result<Event>>),
}

/// [`Prompter`] over the process terminal.
///
/// Raw mode is enabled for the lifetime of the value.
pub struct TerminalPrompter {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    feed: StatusFeed,
    status_open: bool,
}

impl TerminalPrompter {
    /// Take over the terminal. Status lines posted to `feed` are printed
    /// above the prompt as they arrive.
    pub fn new(feed: StatusFeed) -> Result<Self, TerminalError> {
        enable_raw_mode()?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::with_options(
            backend,
            TerminalOptions { viewport: Viewport::Inline(VIEWPORT_HEIGHT) },
        )?;

        Ok(Self { terminal, event_stream: EventStream::new(), feed, status_open: true })
    }

    /// Convert crossterm `KeyCode` to `KeyInput`.
    fn convert_key(code: KeyCode) -> Option<KeyInput> {
        match code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }

    fn is_interrupt(key: &KeyEvent) -> bool {
        key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c' | 'd'))
    }

    /// Insert lines into the scrollback above the viewport.
    fn print(&mut self, lines: &[Line]) -> Result<(), TerminalError> {
        if lines.is_empty() {
            return Ok(());
        }

        let text = Text::from(lines.iter().map(ui::line).collect::<Vec<_>>());
        let width = self.terminal.size()?.width.max(1);
        let height = lines
            .iter()
            .map(|line| {
                let chars = u16::try_from(line.text().chars().count()).unwrap_or(u16::MAX);
                chars.div_ceil(width).max(1)
            })
            .fold(0u16, u16::saturating_add);

        self.terminal.insert_before(height, |buf| {
            Paragraph::new(text).wrap(Wrap { trim: false }).render(buf.area, buf);
        })?;
        Ok(())
    }

    fn flush_status(&mut self) -> Result<(), TerminalError> {
        let lines = self.feed.drain();
        self.print(&lines)
    }

    async fn wake(&mut self) -> Wake {
        tokio::select! {
            biased;

            batch = self.feed.next(), if self.status_open => Wake::Status(batch),
            event = self.event_stream.next() => Wake::Terminal(event),
        }
    }
}

impl Prompter for TerminalPrompter {
    type Error = TerminalError;

    async fn ask(&mut self, prompt: Prompt) -> Result<Answer, Self::Error> {
        self.flush_status()?;
        let mut state = PromptState::new(prompt);

        loop {
            self.terminal.draw(|frame| ui::render(frame, &state))?;

            match self.wake().await {
                Wake::Status(Some(lines)) => self.print(&lines)?,
                Wake::Status(None) => {
                    tracing::debug!("status feed closed");
                    self.status_open = false;
                },
                Wake::Terminal(Some(Ok(Event::Key(key)))) if key.kind == KeyEventKind::Press => {
                    if Self::is_interrupt(&key) {
                        return Err(TerminalError::Interrupted);
                    }
                    let Some(answer) = Self::convert_key(key.code).and_then(|k| state.handle_key(k))
                    else {
                        continue;
                    };

                    self.terminal.clear()?;
                    let echo = Line::plain(format!("{} ", state.prompt().title()))
                        .with(Tone::Info, state.summary(&answer));
                    self.print(&[echo])?;
                    return Ok(answer);
                },
                Wake::Terminal(Some(Ok(Event::Resize(..)))) => self.terminal.autoresize()?,
                Wake::Terminal(Some(Err(e))) => return Err(TerminalError::Io(e)),
                Wake::Terminal(None) => return Err(TerminalError::InputClosed),
                Wake::Terminal(Some(Ok(_))) => {},
            }
        }
    }

    fn show(&mut self, lines: &[Line]) -> Result<(), Self::Error> {
        self.flush_status()?;
        self.print(lines)
    }
}

impl Drop for TerminalPrompter {
    fn drop(&mut self) {
        let _ = self.terminal.clear();
        let _ = self.terminal.show_cursor();
        let _ = disable_raw_mode();
    }
}
