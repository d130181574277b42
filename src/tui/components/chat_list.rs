//! # Chat List Overlay
//!
//! Recent chats with the current character. Opened with Ctrl+O,
//! dismissed with Esc. `d` twice deletes, `n` starts fresh.
//!
//! `ChatListState` lives in `TuiState` while open; `ChatList` is the
//! per-frame render wrapper.

use chrono::{DateTime, Local, Utc};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Clear, List, ListItem, ListState, Padding, Paragraph};

use crate::core::chats::ChatMeta;
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatListEvent {
    Open(String),
    NewChat,
    Delete(String),
    Dismiss,
}

pub struct ChatListState {
    pub character_name: String,
    pub chats: Vec<ChatMeta>,
    pub list_state: ListState,
    /// First `d` arms, second `d` deletes.
    pub confirm_delete: bool,
}

impl ChatListState {
    /// Keep only chats with `character_id`, most recent first.
    pub fn new(character_id: &str, character_name: &str, chats: Vec<ChatMeta>) -> Self {
        let chats: Vec<ChatMeta> = chats
            .into_iter()
            .filter(|c| c.character_id == character_id)
            .collect();
        let mut list_state = ListState::default();
        if !chats.is_empty() {
            list_state.select(Some(0));
        }
        Self {
            character_name: character_name.to_string(),
            chats,
            list_state,
            confirm_delete: false,
        }
    }

    fn selected(&self) -> Option<&ChatMeta> {
        self.list_state.selected().and_then(|i| self.chats.get(i))
    }

    /// Drop a chat from the list after it was deleted on disk.
    pub fn remove_chat(&mut self, id: &str) {
        self.chats.retain(|c| c.id != id);
        let selected = match self.chats.len() {
            0 => None,
            n => Some(self.list_state.selected().unwrap_or(0).min(n - 1)),
        };
        self.list_state.select(selected);
    }
}

impl EventHandler for ChatListState {
    type Event = ChatListEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        let is_delete = matches!(event, TuiEvent::InputChar('d'));
        if !is_delete {
            self.confirm_delete = false;
        }

        match event {
            TuiEvent::Escape => Some(ChatListEvent::Dismiss),
            TuiEvent::CursorUp => {
                if !self.chats.is_empty() {
                    self.list_state.select_previous();
                }
                None
            }
            TuiEvent::CursorDown => {
                if let Some(i) = self.list_state.selected()
                    && i + 1 < self.chats.len()
                {
                    self.list_state.select(Some(i + 1));
                }
                None
            }
            TuiEvent::Submit => self.selected().map(|c| ChatListEvent::Open(c.id.clone())),
            TuiEvent::InputChar('n') => Some(ChatListEvent::NewChat),
            TuiEvent::InputChar('d') => {
                let id = self.selected()?.id.clone();
                if self.confirm_delete {
                    self.confirm_delete = false;
                    Some(ChatListEvent::Delete(id))
                } else {
                    self.confirm_delete = true;
                    None
                }
            }
            _ => None,
        }
    }
}

pub struct ChatList<'a> {
    pub state: &'a mut ChatListState,
}

impl Component for ChatList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(80, 70, area);
        frame.render_widget(Clear, overlay);

        let help = if self.state.confirm_delete {
            " Press d again to delete · Esc cancel "
        } else {
            " Enter open · n new · d delete · Esc back "
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" Chats with {} ", self.state.character_name))
            .title_bottom(Line::from(help).centered())
            .padding(Padding::horizontal(1));

        if self.state.chats.is_empty() {
            let empty = Paragraph::new("No saved chats yet.")
                .style(Style::default().fg(Color::DarkGray))
                .centered()
                .block(block);
            frame.render_widget(empty, overlay);
            return;
        }

        let inner_width = overlay.width.saturating_sub(4) as usize;
        let selected = self.state.list_state.selected();
        let confirm = self.state.confirm_delete;
        let items: Vec<ListItem> = self
            .state
            .chats
            .iter()
            .enumerate()
            .map(|(i, chat)| {
                let date = format_timestamp(chat.updated_at);
                let count = format!("{} msgs", chat.message_count);
                let title_width = inner_width.saturating_sub(date.len() + count.len() + 4);
                let title = truncate_chars(&chat.title, title_width);

                let style = match (selected == Some(i), confirm) {
                    (true, true) => Style::default()
                        .fg(Color::Red)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED),
                    (true, false) => Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED),
                    _ => Style::default().fg(Color::Gray),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(date, style),
                    Span::styled("  ", style),
                    Span::styled(format!("{title:<title_width$}"), style),
                    Span::styled("  ", style),
                    Span::styled(count, style),
                ]))
            })
            .collect();

        frame.render_stateful_widget(List::new(items).block(block), overlay, &mut self.state.list_state);
    }
}

/// Millisecond timestamp as a local "Jan 15".
fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&Local)
        .format("%b %d")
        .to_string()
}

/// Fit `s` into `max` chars, ending with "..." when cut.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max <= 3 {
        ".".repeat(max)
    } else {
        let kept: String = s.chars().take(max - 3).collect();
        format!("{kept}...")
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, outer: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(outer);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn meta(id: &str, character_id: &str, title: &str) -> ChatMeta {
        ChatMeta {
            id: id.to_string(),
            title: title.to_string(),
            character_id: character_id.to_string(),
            character_name: "Luna".to_string(),
            created_at: 0,
            updated_at: 0,
            message_count: 3,
        }
    }

    fn state() -> ChatListState {
        ChatListState::new(
            "luna",
            "Luna",
            vec![
                meta("a", "luna", "Tea time"),
                meta("b", "other", "Someone else"),
                meta("c", "luna", "Stargazing"),
            ],
        )
    }

    #[test]
    fn filters_by_character() {
        let state = state();
        let ids: Vec<&str> = state.chats.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn navigate_and_open() {
        let mut state = state();
        assert_eq!(state.handle_event(&TuiEvent::CursorDown), None);
        assert_eq!(state.handle_event(&TuiEvent::CursorDown), None);
        assert_eq!(
            state.handle_event(&TuiEvent::Submit),
            Some(ChatListEvent::Open("c".to_string()))
        );
        state.handle_event(&TuiEvent::CursorUp);
        assert_eq!(
            state.handle_event(&TuiEvent::Submit),
            Some(ChatListEvent::Open("a".to_string()))
        );
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut state = state();
        assert_eq!(state.handle_event(&TuiEvent::InputChar('d')), None);
        assert!(state.confirm_delete);
        assert_eq!(
            state.handle_event(&TuiEvent::InputChar('d')),
            Some(ChatListEvent::Delete("a".to_string()))
        );

        state.handle_event(&TuiEvent::InputChar('d'));
        state.handle_event(&TuiEvent::CursorDown);
        assert!(!state.confirm_delete);

        state.remove_chat("c");
        assert_eq!(state.list_state.selected(), Some(0));
        state.remove_chat("a");
        assert_eq!(state.list_state.selected(), None);
        assert_eq!(state.handle_event(&TuiEvent::Submit), None);
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 8), "héllo...");
        assert_eq!(truncate_chars("short", 8), "short");
    }

    #[test]
    fn renders_titles() {
        let mut state = state();
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|f| ChatList { state: &mut state }.render(f, f.area()))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Chats with Luna"));
        assert!(text.contains("Tea time"));
        assert!(text.contains("Stargazing"));
    }
}
