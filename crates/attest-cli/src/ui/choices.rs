//! Option list
//!
//! Numbered options with the highlighted one marked. Long lists scroll so the
//! highlighted option stays visible.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::Paragraph,
};

use crate::input::PromptState;

/// Render the options of a selection or confirmation.
pub fn render(frame: &mut Frame, state: &PromptState, area: Rect) {
    let visible = usize::from(area.height).max(1);
    let offset = (state.selected() + 1).saturating_sub(visible);

    let lines: Vec<Line> = state
        .prompt()
        .choices()
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(index, label)| {
            if index == state.selected() {
                Line::styled(
                    format!("> {}. {label}", index + 1),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )
            } else {
                Line::raw(format!("  {}. {label}", index + 1))
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}
