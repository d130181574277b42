use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

/// TUI-specific input events
#[derive(Debug, Clone, PartialEq)]
pub enum TuiEvent {
    Resize,
    /// Ctrl+C quits from anywhere.
    ForceQuit,
    /// Ctrl+O opens the chat list.
    OpenChats,
    /// Ctrl+N starts a new chat with the same character.
    NewChat,
    /// Ctrl+R cycles the reply mode.
    CycleMode,

    Submit,
    Escape,
    InputChar(char),
    Paste(String), // Bracketed paste - preserves newlines
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    CursorHome,
    CursorEnd,

    ScrollUp,
    ScrollDown,
    ScrollPageUp,
    ScrollPageDown,
    MouseMove(u16, u16),
    MouseClick(u16, u16),
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(Duration::ZERO)
}

pub fn poll_event_timeout(timeout: Duration) -> Option<TuiEvent> {
    if !event::poll(timeout).unwrap_or(false) {
        return None;
    }
    match event::read().ok()? {
        // Key releases arrive with the keyboard enhancement flags on
        Event::Key(key) if key.kind == KeyEventKind::Release => None,
        Event::Key(key) => map_key(key),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Moved => Some(TuiEvent::MouseMove(mouse.column, mouse.row)),
            MouseEventKind::Down(MouseButton::Left) => {
                Some(TuiEvent::MouseClick(mouse.column, mouse.row))
            }
            MouseEventKind::ScrollUp => Some(TuiEvent::ScrollUp),
            MouseEventKind::ScrollDown => Some(TuiEvent::ScrollDown),
            _ => None,
        },
        Event::Paste(data) => Some(TuiEvent::Paste(data)),
        Event::Resize(..) => Some(TuiEvent::Resize),
        _ => None,
    }
}

fn map_key(key: KeyEvent) -> Option<TuiEvent> {
    log::debug!("Key event: {:?} with modifiers {:?}", key.code, key.modifiers);
    let event = match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => TuiEvent::ForceQuit,
        (KeyModifiers::CONTROL, KeyCode::Char('o')) => TuiEvent::OpenChats,
        (KeyModifiers::CONTROL, KeyCode::Char('n')) => TuiEvent::NewChat,
        (KeyModifiers::CONTROL, KeyCode::Char('r')) => TuiEvent::CycleMode,
        // Ctrl+J is ASCII LF; Shift+Enter needs the kitty protocol
        (KeyModifiers::CONTROL, KeyCode::Char('j')) => TuiEvent::InputChar('\n'),
        (KeyModifiers::SHIFT, KeyCode::Enter) => TuiEvent::InputChar('\n'),
        (m, KeyCode::Char(_)) if m.contains(KeyModifiers::CONTROL) => return None,
        (_, KeyCode::Char(c)) => TuiEvent::InputChar(c),
        (_, KeyCode::Enter) => TuiEvent::Submit,
        (_, KeyCode::Esc) => TuiEvent::Escape,
        (_, KeyCode::Backspace) => TuiEvent::Backspace,
        (_, KeyCode::Delete) => TuiEvent::Delete,
        (_, KeyCode::Left) => TuiEvent::CursorLeft,
        (_, KeyCode::Right) => TuiEvent::CursorRight,
        (_, KeyCode::Up) => TuiEvent::CursorUp,
        (_, KeyCode::Down) => TuiEvent::CursorDown,
        (_, KeyCode::Home) => TuiEvent::CursorHome,
        (_, KeyCode::End) => TuiEvent::CursorEnd,
        (_, KeyCode::PageUp) => TuiEvent::ScrollPageUp,
        (_, KeyCode::PageDown) => TuiEvent::ScrollPageDown,
        _ => return None,
    };
    Some(event)
}
