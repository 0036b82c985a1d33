//! Output lines
//!
//! Maps the app's toned lines onto terminal colors.

use attest_app::{Line as OutputLine, Tone};
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

/// Terminal style for a tone.
pub fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Plain => Style::default(),
        Tone::Info => Style::default().fg(Color::Cyan),
        Tone::Success => Style::default().fg(Color::Green),
        Tone::Warning => Style::default().fg(Color::Yellow),
        Tone::Error => Style::default().fg(Color::Red),
    }
}

/// Convert an output line for rendering.
pub fn line(line: &OutputLine) -> Line<'static> {
    Line::from(
        line.spans
            .iter()
            .map(|span| Span::styled(span.text.clone(), tone_style(span.tone)))
            .collect::<Vec<_>>(),
    )
}
