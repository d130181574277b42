//! # Composer Component
//!
//! The text field at the bottom of the screen. Writes new messages and,
//! when an edit is in progress, rewrites an existing one.
//!
//! ## State Management
//!
//! The buffer, cursor (byte offset) and internal scroll are component state.
//! The reply mode and `dimmed` flag are props synced from the app each frame.
//! Long input wraps; past `MAX_VISIBLE_LINES` the field scrolls to keep the
//! cursor in view.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};

use crate::inference::ReplyMode;
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Border (2) + horizontal padding (2).
const HORIZONTAL_OVERHEAD: u16 = 4;
const VERTICAL_OVERHEAD: u16 = 2;
const MAX_VISIBLE_LINES: u16 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum ComposerEvent {
    /// Send a new message.
    Submit(String),
    /// Replace the text of message `id`.
    SaveEdit { id: String, text: String },
    ContentChanged,
}

pub struct Composer {
    buffer: String,
    /// Byte offset into `buffer`, always on a char boundary.
    cursor: usize,
    scroll: u16,
    /// Id of the message being edited.
    editing: Option<String>,
    /// Draft put aside while editing, restored afterwards.
    stashed_draft: Option<String>,
    pub mode: ReplyMode,
    pub dimmed: bool,
}

impl Composer {
    pub fn new(mode: ReplyMode) -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            scroll: 0,
            editing: None,
            stashed_draft: None,
            mode,
            dimmed: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Load a message's text for editing; any draft is kept for later.
    pub fn begin_edit(&mut self, id: String, text: &str) {
        if self.editing.is_none() {
            self.stashed_draft = Some(std::mem::take(&mut self.buffer));
        }
        self.editing = Some(id);
        self.set_buffer(text.to_string());
    }

    /// Abandon the edit and bring the draft back. Returns the edited id.
    pub fn cancel_edit(&mut self) -> Option<String> {
        let id = self.editing.take()?;
        let draft = self.stashed_draft.take().unwrap_or_default();
        self.set_buffer(draft);
        Some(id)
    }

    fn set_buffer(&mut self, text: String) {
        self.buffer = text;
        self.cursor = self.buffer.len();
        self.scroll = 0;
    }

    /// Total height including borders, clamped to the visible line limit.
    pub fn calculate_height(&self, width: u16) -> u16 {
        let lines = wrapped_lines(&self.buffer, width.saturating_sub(HORIZONTAL_OVERHEAD));
        (lines.len() as u16).clamp(1, MAX_VISIBLE_LINES) + VERTICAL_OVERHEAD
    }

    fn title(&self) -> Line<'static> {
        if self.editing.is_some() {
            Line::from(" Edit message · Enter saves · Esc cancels ")
        } else {
            Line::from(format!(" Message · {} ", self.mode.label()))
        }
    }

    fn insert(&mut self, text: &str) {
        self.buffer.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    fn line_start(&self) -> usize {
        self.buffer[..self.cursor].rfind('\n').map_or(0, |i| i + 1)
    }

    fn line_end(&self) -> usize {
        self.buffer[self.cursor..]
            .find('\n')
            .map_or(self.buffer.len(), |i| self.cursor + i)
    }

    /// Move to the previous or next logical line, keeping the column.
    fn move_line(&mut self, down: bool) -> bool {
        let start = self.line_start();
        let column = self.buffer[start..self.cursor].chars().count();
        let (target_start, target_end) = if down {
            let end = self.line_end();
            if end == self.buffer.len() {
                return false;
            }
            let next_start = end + 1;
            let next_end = self.buffer[next_start..]
                .find('\n')
                .map_or(self.buffer.len(), |i| next_start + i);
            (next_start, next_end)
        } else {
            if start == 0 {
                return false;
            }
            let prev_end = start - 1;
            let prev_start = self.buffer[..prev_end].rfind('\n').map_or(0, |i| i + 1);
            (prev_start, prev_end)
        };
        let line = &self.buffer[target_start..target_end];
        self.cursor = target_start
            + line
                .char_indices()
                .nth(column)
                .map_or(line.len(), |(i, _)| i);
        true
    }

    fn keep_cursor_visible(&mut self, row: u16) {
        if row < self.scroll {
            self.scroll = row;
        } else if row >= self.scroll + MAX_VISIBLE_LINES {
            self.scroll = row + 1 - MAX_VISIBLE_LINES;
        }
    }
}

fn wrap_options(width: u16) -> textwrap::Options<'static> {
    textwrap::Options::new(width.max(1) as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
}

/// Visual lines for `text` at `width`. Each logical line yields at least one.
fn wrapped_lines(text: &str, width: u16) -> Vec<String> {
    let options = wrap_options(width);
    let mut out = Vec::new();
    for logical in text.split('\n') {
        let wrapped = textwrap::wrap(logical, &options);
        if wrapped.is_empty() {
            out.push(String::new());
        } else {
            out.extend(wrapped.into_iter().map(|l| l.into_owned()));
        }
    }
    out
}

/// Visual (row, column) of byte offset `pos`.
fn cursor_position(text: &str, pos: usize, width: u16) -> (u16, u16) {
    let before = &text[..pos];
    let mut logical = before.split('\n').peekable();
    let mut row = 0u16;
    while let Some(line) = logical.next() {
        let wrapped = textwrap::wrap(line, wrap_options(width));
        if logical.peek().is_some() {
            row += (wrapped.len() as u16).max(1);
            continue;
        }
        let Some((last, earlier)) = wrapped.split_last() else {
            return (row, 0);
        };
        // textwrap drops spaces at break points, so locate the last
        // segment in the raw line and count from there
        let mut offset = 0;
        for seg in earlier {
            offset += line[offset..].find(&**seg).unwrap_or(0) + seg.len();
        }
        offset += line[offset..].find(&**last).unwrap_or(0);
        let column = line[offset..].chars().count();
        return (row + earlier.len() as u16, column as u16);
    }
    (row, 0)
}

fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos].char_indices().next_back().map_or(0, |(i, _)| i)
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map_or(text.len(), |c| pos + c.len_utf8())
}

impl Component for Composer {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(HORIZONTAL_OVERHEAD);
        let lines = wrapped_lines(&self.buffer, width);
        let (row, col) = cursor_position(&self.buffer, self.cursor, width);
        self.keep_cursor_visible(row);

        let accent = if self.editing.is_some() {
            Color::Yellow
        } else {
            Color::Green
        };
        let style = if self.dimmed {
            Style::default().fg(accent).add_modifier(Modifier::DIM)
        } else {
            Style::default().fg(accent)
        };

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(style)
            .title(self.title())
            .title_bottom(Line::from(" Ctrl+R mode · Ctrl+O chats · Ctrl+N new ").right_aligned())
            .padding(Padding::horizontal(1));

        let visible: Vec<Line> = lines
            .into_iter()
            .skip(self.scroll as usize)
            .take(MAX_VISIBLE_LINES as usize)
            .map(Line::from)
            .collect();
        frame.render_widget(Paragraph::new(visible).style(style).block(block), area);

        if !self.dimmed {
            let x = area.x + 2 + col.min(width.saturating_sub(1));
            let y = area.y + 1 + row.saturating_sub(self.scroll);
            frame.set_cursor_position((x, y));
        }
    }
}

impl EventHandler for Composer {
    type Event = ComposerEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                let mut utf8 = [0u8; 4];
                self.insert(c.encode_utf8(&mut utf8));
                Some(ComposerEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                self.insert(&text.replace("\r\n", "\n").replace('\r', "\n"));
                Some(ComposerEvent::ContentChanged)
            }
            TuiEvent::Backspace if self.cursor > 0 => {
                let prev = prev_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                Some(ComposerEvent::ContentChanged)
            }
            TuiEvent::Delete if self.cursor < self.buffer.len() => {
                let next = next_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(self.cursor..next);
                Some(ComposerEvent::ContentChanged)
            }
            TuiEvent::CursorLeft if self.cursor > 0 => {
                self.cursor = prev_char_boundary(&self.buffer, self.cursor);
                Some(ComposerEvent::ContentChanged)
            }
            TuiEvent::CursorRight if self.cursor < self.buffer.len() => {
                self.cursor = next_char_boundary(&self.buffer, self.cursor);
                Some(ComposerEvent::ContentChanged)
            }
            TuiEvent::CursorHome => {
                let start = self.line_start();
                (self.cursor != start).then(|| {
                    self.cursor = start;
                    ComposerEvent::ContentChanged
                })
            }
            TuiEvent::CursorEnd => {
                let end = self.line_end();
                (self.cursor != end).then(|| {
                    self.cursor = end;
                    ComposerEvent::ContentChanged
                })
            }
            TuiEvent::CursorUp => self.move_line(false).then_some(ComposerEvent::ContentChanged),
            TuiEvent::CursorDown => self.move_line(true).then_some(ComposerEvent::ContentChanged),
            TuiEvent::Submit => {
                if let Some(id) = self.editing.take() {
                    let text = std::mem::take(&mut self.buffer);
                    let draft = self.stashed_draft.take().unwrap_or_default();
                    self.set_buffer(draft);
                    return Some(ComposerEvent::SaveEdit { id, text });
                }
                if self.buffer.trim().is_empty() {
                    return None;
                }
                let text = std::mem::take(&mut self.buffer);
                self.set_buffer(String::new());
                Some(ComposerEvent::Submit(text))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn type_str(composer: &mut Composer, text: &str) {
        for c in text.chars() {
            composer.handle_event(&TuiEvent::InputChar(c));
        }
    }

    #[test]
    fn typing_and_backspace() {
        let mut composer = Composer::new(ReplyMode::Roleplay);
        type_str(&mut composer, "hé");
        assert_eq!(composer.text(), "hé");
        assert_eq!(
            composer.handle_event(&TuiEvent::Backspace),
            Some(ComposerEvent::ContentChanged)
        );
        assert_eq!(composer.text(), "h");
    }

    #[test]
    fn submit_clears_and_ignores_blank() {
        let mut composer = Composer::new(ReplyMode::Roleplay);
        assert_eq!(composer.handle_event(&TuiEvent::Submit), None);
        type_str(&mut composer, "hello");
        assert_eq!(
            composer.handle_event(&TuiEvent::Submit),
            Some(ComposerEvent::Submit("hello".to_string()))
        );
        assert!(composer.text().is_empty());
    }

    #[test]
    fn edit_round_trip_restores_draft() {
        let mut composer = Composer::new(ReplyMode::Roleplay);
        type_str(&mut composer, "draft");
        composer.begin_edit("m1".to_string(), "old text");
        assert_eq!(composer.text(), "old text");
        assert_eq!(composer.editing(), Some("m1"));

        type_str(&mut composer, "!");
        assert_eq!(
            composer.handle_event(&TuiEvent::Submit),
            Some(ComposerEvent::SaveEdit {
                id: "m1".to_string(),
                text: "old text!".to_string()
            })
        );
        assert_eq!(composer.text(), "draft");
        assert_eq!(composer.editing(), None);
    }

    #[test]
    fn cancel_edit_restores_draft() {
        let mut composer = Composer::new(ReplyMode::Roleplay);
        type_str(&mut composer, "draft");
        composer.begin_edit("m1".to_string(), "old");
        assert_eq!(composer.cancel_edit(), Some("m1".to_string()));
        assert_eq!(composer.text(), "draft");
        assert_eq!(composer.cancel_edit(), None);
    }

    #[test]
    fn up_down_keep_column() {
        let mut composer = Composer::new(ReplyMode::Roleplay);
        composer.handle_event(&TuiEvent::Paste("abcd\nxy\nlonger".to_string()));
        composer.handle_event(&TuiEvent::CursorUp);
        composer.handle_event(&TuiEvent::CursorUp);
        composer.handle_event(&TuiEvent::InputChar('!'));
        assert_eq!(composer.text(), "ab!cd\nxy\nlonger");
        assert_eq!(composer.handle_event(&TuiEvent::CursorUp), None);
    }

    #[test]
    fn height_grows_then_caps() {
        let mut composer = Composer::new(ReplyMode::Roleplay);
        assert_eq!(composer.calculate_height(40), 3);
        composer.handle_event(&TuiEvent::Paste("1\n2\n3\n4\n5\n6\n7".to_string()));
        assert_eq!(composer.calculate_height(40), MAX_VISIBLE_LINES + VERTICAL_OVERHEAD);
    }

    #[test]
    fn cursor_position_follows_wrapping() {
        assert_eq!(cursor_position("hello world", 11, 5), (1, 5));
        assert_eq!(cursor_position("ab\ncd", 4, 10), (1, 1));
        assert_eq!(cursor_position("ab\n", 3, 10), (1, 0));
    }

    #[test]
    fn render_shows_mode_and_edit_title() {
        let backend = TestBackend::new(60, 3);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut composer = Composer::new(ReplyMode::Story);

        terminal.draw(|f| composer.render(f, f.area())).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Story"));

        composer.begin_edit("m1".to_string(), "fix me");
        terminal.draw(|f| composer.render(f, f.area())).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Edit message"));
    }
}
