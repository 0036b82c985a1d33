//! Prompt state and key handling.
//!
//! [`PromptState`] owns everything the operator has done to the prompt on
//! screen: the highlighted option, or the text buffer and cursor. Keys are
//! applied one at a time; the key that completes the prompt yields the
//! [`Answer`].

use attest_app::{Answer, Prompt};

/// Key input events from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Character input.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home key.
    Home,
    /// End key.
    End,
}

/// A prompt being answered.
#[derive(Debug, Clone)]
pub struct PromptState {
    prompt: Prompt,
    /// Highlighted option for selections and confirmations.
    selected: usize,
    /// Text buffer for input prompts.
    buffer: String,
    /// Cursor position in characters.
    cursor: usize,
}

impl PromptState {
    /// Start answering `prompt`. The first option is highlighted.
    pub fn new(prompt: Prompt) -> Self {
        Self { prompt, selected: 0, buffer: String::new(), cursor: 0 }
    }

    /// The prompt.
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Highlighted option.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Typed text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply one key. Returns the answer once the prompt is complete.
    pub fn handle_key(&mut self, key: KeyInput) -> Option<Answer> {
        match self.prompt {
            Prompt::Input { .. } => self.handle_text(key),
            Prompt::Select { .. } | Prompt::Confirm { .. } => self.handle_choice(key),
        }
    }

    fn handle_choice(&mut self, key: KeyInput) -> Option<Answer> {
        let last = self.prompt.choices().len().saturating_sub(1);
        match key {
            KeyInput::Up | KeyInput::Left => {
                self.selected = if self.selected == 0 { last } else { self.selected - 1 };
            },
            KeyInput::Down | KeyInput::Right => {
                self.selected = if self.selected >= last { 0 } else { self.selected + 1 };
            },
            KeyInput::Home => self.selected = 0,
            KeyInput::End => self.selected = last,
            KeyInput::Char(c) => return self.shortcut(c),
            KeyInput::Enter => return Some(self.choice()),
            KeyInput::Backspace | KeyInput::Delete => {},
        }
        None
    }

    /// `y`/`n` answer confirmations, digits pick a numbered option.
    fn shortcut(&mut self, c: char) -> Option<Answer> {
        if let Prompt::Confirm { .. } = self.prompt {
            return match c.to_ascii_lowercase() {
                'y' => Some(Answer::Confirmed(true)),
                'n' => Some(Answer::Confirmed(false)),
                _ => None,
            };
        }

        let index = c.to_digit(10).and_then(|d| usize::try_from(d).ok())?.checked_sub(1)?;
        if index < self.prompt.choices().len() {
            self.selected = index;
            return Some(self.choice());
        }
        None
    }

    fn choice(&self) -> Answer {
        match self.prompt {
            Prompt::Confirm { .. } => Answer::Confirmed(self.selected == 0),
            _ => Answer::Choice(self.selected),
        }
    }

    fn handle_text(&mut self, key: KeyInput) -> Option<Answer> {
        let len = self.buffer.chars().count();
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_index(self.cursor);
                self.buffer.insert(at, c);
                self.cursor += 1;
            },
            KeyInput::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.buffer.remove(at);
                }
            },
            KeyInput::Delete => {
                if self.cursor < len {
                    let at = self.byte_index(self.cursor);
                    self.buffer.remove(at);
                }
            },
            KeyInput::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyInput::Right => self.cursor = (self.cursor + 1).min(len),
            KeyInput::Home => self.cursor = 0,
            KeyInput::End => self.cursor = len,
            KeyInput::Enter => {
                self.cursor = 0;
                return Some(Answer::Text(std::mem::take(&mut self.buffer)));
            },
            KeyInput::Up | KeyInput::Down => {},
        }
        None
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }

    /// How the answer reads back in the scrollback.
    pub fn summary(&self, answer: &Answer) -> String {
        match answer {
            Answer::Choice(index) => {
                self.prompt.choices().get(*index).map_or_else(String::new, ToString::to_string)
            },
            Answer::Text(text) => text.clone(),
            Answer::Confirmed(true) => "YES".to_string(),
            Answer::Confirmed(false) => "NO".to_string(),
        }
    }
}
