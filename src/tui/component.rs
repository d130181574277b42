use ratatui::Frame;
use ratatui::layout::Rect;

use super::event::TuiEvent;

/// A piece of the screen.
///
/// Components take their data as props (struct fields) and may borrow
/// persistent state from `TuiState` (`&mut State` fields). A component
/// value lives for one frame; anything that must survive the frame
/// belongs in the state it borrows.
///
/// `render` takes `&mut self` so a component can update caches and
/// scroll offsets while drawing, the same way `StatefulWidget` does.
pub trait Component {
    fn render(&mut self, frame: &mut Frame, area: Rect);
}

/// Turns raw terminal events into something the event loop acts on.
pub trait EventHandler {
    /// What the component reports upward.
    type Event;

    /// `None` means the event was ignored or fully handled internally.
    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event>;
}
