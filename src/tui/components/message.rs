use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::core::message::Message;
use crate::tui::component::Component;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Borders (1 left + 1 right) plus padding.
pub const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Top + bottom borders.
pub const VERTICAL_OVERHEAD: u16 = 2;

/// Pulse intensity above which the border turns BOLD.
const PULSE_BOLD_THRESHOLD: f32 = 0.6;
/// Pulse intensity above which the border loses DIM.
const PULSE_NORMAL_THRESHOLD: f32 = 0.2;

/// Border colour and body colour for a message.
///
/// - **User** (green): the persona's messages; segments inherit green
/// - **Character** (blue border, white body)
/// - **System** (yellow): generation failures and safety notices
pub fn palette(message: &Message) -> (Color, Color) {
    if message.is_system {
        (Color::Yellow, Color::Yellow)
    } else if message.is_user_message {
        (Color::Green, Color::Green)
    } else {
        (Color::Blue, Color::White)
    }
}

/// One chat message in a rounded card.
///
/// ```text
/// ╭ Luna ─────────────────────── ‹2/3› ╮
/// │ smiles "Welcome back!"             │
/// ╰────────────────────────────────────╯
/// ```
///
/// Transient: built each frame from the message and its already rendered
/// body. Selection and hover are passed in by `MessageList`.
#[derive(Clone)]
pub struct MessageCard<'a> {
    pub message: &'a Message,
    pub body: Text<'static>,
    pub is_selected: bool,
    pub is_hovered: bool,
    /// Pulse (0.0 to 1.0) while a new variation is being generated.
    pub pulse_intensity: f32,
}

impl<'a> MessageCard<'a> {
    pub fn new(message: &'a Message, body: Text<'static>) -> Self {
        Self {
            message,
            body,
            is_selected: false,
            is_hovered: false,
            pulse_intensity: 0.0,
        }
    }

    /// Rows needed at `width`, borders included. Uses the same wrapping as
    /// the render pass so scroll math and drawing agree.
    pub fn calculate_height(body: &Text<'_>, width: u16) -> u16 {
        let inner = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if inner == 0 {
            return 1;
        }
        let lines = Paragraph::new(body.clone())
            .wrap(Wrap { trim: false })
            .line_count(inner);
        (lines as u16).max(1) + VERTICAL_OVERHEAD
    }

    fn title(&self) -> Line<'static> {
        let mut title = format!(" {} ", self.message.sender);
        if self.message.is_pinned {
            title.push_str("[pinned] ");
        }
        Line::from(title)
    }

    fn variation_badge(&self) -> Option<Line<'static>> {
        let (current, total) = self.message.variation_position()?;
        Some(Line::from(format!(" ‹{current}/{total}› ")).right_aligned())
    }
}

impl Widget for MessageCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (accent, base_fg) = palette(self.message);
        let accent_style = Style::default().fg(accent);

        // Selection overrides hover: cyan for selected, bright for hover, dim otherwise
        let mut border_style = if self.is_selected {
            Style::default().fg(Color::Cyan)
        } else if self.is_hovered {
            accent_style
        } else {
            accent_style.add_modifier(Modifier::DIM)
        };
        if self.pulse_intensity > PULSE_BOLD_THRESHOLD {
            border_style = border_style
                .remove_modifier(Modifier::DIM)
                .add_modifier(Modifier::BOLD);
        } else if self.pulse_intensity > PULSE_NORMAL_THRESHOLD {
            border_style = border_style.remove_modifier(Modifier::DIM);
        }

        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .title(self.title())
            .padding(Padding::horizontal(CONTENT_PAD_H));
        if let Some(badge) = self.variation_badge() {
            block = block.title(badge);
        }
        if self.is_selected {
            block = block.title_bottom(
                Line::from(" e edit · d delete · p pin · r regenerate · ←/→ ").right_aligned(),
            );
        }

        let inner = block.inner(area);
        block.render(area, buf);
        Paragraph::new(self.body)
            .style(Style::default().fg(base_fg))
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

impl Component for MessageCard<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(self.clone(), area);
    }
}
