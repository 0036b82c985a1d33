//! UI rendering
//!
//! Rendering functions that turn a [`PromptState`] and output lines into
//! ratatui widgets. All functions are pure (no I/O).

mod choices;
mod input;
mod lines;

pub use lines::{line, tone_style};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::Paragraph,
};

use crate::input::PromptState;

/// Render the prompt viewport.
pub fn render(frame: &mut Frame, state: &PromptState) {
    const TITLE_HEIGHT: u16 = 1;
    const BODY_MIN_HEIGHT: u16 = 1;
    const HINT_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(TITLE_HEIGHT),
            Constraint::Min(BODY_MIN_HEIGHT),
            Constraint::Length(HINT_HEIGHT),
        ])
        .split(frame.area());

    let [title_area, body_area, hint_area] = chunks.as_ref() else {
        return;
    };

    let title = Paragraph::new(Line::styled(
        state.prompt().title().to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(title, *title_area);

    match state.prompt() {
        attest_app::Prompt::Input { .. } => input::render(frame, state, *body_area),
        attest_app::Prompt::Select { .. } | attest_app::Prompt::Confirm { .. } => {
            choices::render(frame, state, *body_area);
        },
    }

    let hint = Paragraph::new(hint(state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hint, *hint_area);
}

fn hint(state: &PromptState) -> &'static str {
    match state.prompt() {
        attest_app::Prompt::Input { .. } => "enter to submit, ctrl-c to quit",
        attest_app::Prompt::Confirm { .. } => "y/n or arrows and enter, ctrl-c to quit",
        attest_app::Prompt::Select { .. } => "arrows or 1-9 and enter, ctrl-c to quit",
    }
}

#[cfg(test)]
mod tests {
    use attest_app::Prompt;
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::input::KeyInput;

    fn screen(state: &PromptState) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        terminal.draw(|frame| render(frame, state)).unwrap();

        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        let symbols: Vec<&str> = buffer.content.iter().map(|cell| cell.symbol()).collect();
        symbols.chunks(width).map(|row| row.concat().trim_end().to_string()).collect()
    }

    #[test]
    fn menu_highlights_selected_option() {
        let mut state = PromptState::new(Prompt::menu(["List all credentials", "Exit"]));
        state.handle_key(KeyInput::Down);

        let rows = screen(&state);
        assert_eq!(rows[0], "Options:");
        assert_eq!(rows[1], "  1. List all credentials");
        assert_eq!(rows[2], "> 2. Exit");
        assert!(rows[7].starts_with("arrows or 1-9"));
    }

    #[test]
    fn input_shows_typed_text() {
        let mut state = PromptState::new(Prompt::input("Write your message (q to cancel):"));
        state.handle_key(KeyInput::Char('h'));
        state.handle_key(KeyInput::Char('i'));

        let rows = screen(&state);
        assert_eq!(rows[0], "Write your message (q to cancel):");
        assert!(rows.iter().any(|row| row.contains("> hi")));
    }
}
