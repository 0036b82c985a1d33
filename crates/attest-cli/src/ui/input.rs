//! Free-text entry.
//!
//! A single line: a marker, then the typed text. Text wider than the line
//! scrolls horizontally so the cursor stays in view.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::input::PromptState;

const MARKER: &str = "> ";
const MARKER_WIDTH: u16 = 2;

/// Render the input line and place the cursor on it.
pub fn render(frame: &mut Frame, state: &PromptState, area: Rect) {
    if area.width <= MARKER_WIDTH || area.height == 0 {
        return;
    }
    let line_area = Rect { height: 1, ..area };

    // One cell is kept free after the text for the cursor.
    let room = line_area.width - MARKER_WIDTH - 1;
    let cursor = u16::try_from(state.cursor()).unwrap_or(u16::MAX);
    let scroll = cursor.saturating_sub(room);

    let typed: String = state.buffer().chars().skip(usize::from(scroll)).collect();
    let line = Line::from(vec![
        Span::styled(MARKER, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw(typed),
    ]);
    frame.render_widget(Paragraph::new(line), line_area);

    let cursor_x = line_area.x.saturating_add(MARKER_WIDTH).saturating_add(cursor - scroll);
    frame.set_cursor_position((cursor_x, line_area.y));
}

#[cfg(test)]
mod tests {
    use attest_app::Prompt;
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::input::KeyInput;

    fn row(state: &PromptState, width: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, 1)).unwrap();
        terminal.draw(|frame| render(frame, state, frame.area())).unwrap();
        terminal.backend().buffer().content.iter().map(|cell| cell.symbol()).collect::<String>()
    }

    #[test]
    fn long_text_scrolls_to_the_cursor() {
        let mut state = PromptState::new(Prompt::input("Say"));
        for c in "abcdefghijklmno".chars() {
            state.handle_key(KeyInput::Char(c));
        }
        assert_eq!(row(&state, 12).trim_end(), "> ghijklmno");

        state.handle_key(KeyInput::Home);
        assert_eq!(row(&state, 12).trim_end(), "> abcdefghij");
    }
}
