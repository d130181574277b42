//! # TitleBar Component
//!
//! One-line bar at the top: who you're talking to, the reply mode, the
//! model, and the latest status message.
//!
//! ```text
//! Luna · Roleplay · mistralai/mistral-nemo | Luna is typing...   ↓ New
//! ```
//!
//! Stateless; all fields are props filled from `App` and `TuiState` each frame.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::inference::ReplyMode;
use crate::tui::component::Component;

pub struct TitleBar<'a> {
    pub character_name: &'a str,
    pub mode: ReplyMode,
    pub model_name: &'a str,
    pub status_message: &'a str,
    /// Whether there's content below the current scroll position
    pub has_unseen_content: bool,
}

impl TitleBar<'_> {
    fn line(&self) -> Line<'static> {
        let dim = Style::default().fg(Color::DarkGray);
        let mut spans = vec![
            Span::styled(
                self.character_name.to_string(),
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" · ", dim),
            Span::raw(self.mode.label()),
            Span::styled(" · ", dim),
            Span::styled(self.model_name.to_string(), dim),
        ];
        if !self.status_message.is_empty() {
            spans.push(Span::styled(" | ", dim));
            spans.push(Span::raw(self.status_message.to_string()));
        }
        if self.has_unseen_content {
            spans.push(Span::styled(
                "  ↓ New",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        }
        Line::from(spans)
    }
}

impl Component for TitleBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(self.line(), area);
    }
}
