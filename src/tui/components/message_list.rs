//! # MessageList Component
//!
//! Scrollable view of the conversation.
//!
//! ## Responsibilities
//!
//! - Lay out only the messages near the viewport (`VirtualWindow`)
//! - Measure real card heights lazily and remember them (`HeightCache`)
//! - Scrolling, stick-to-bottom, and hit testing for the mouse
//!
//! ## Architecture
//!
//! `MessageList` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent state) and the message slice (props).
//! Messages that were never on screen count with the estimated height until
//! they are measured, so the scrollbar settles as the user scrolls.

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::message::Message;
use crate::core::segment::SegmentOptions;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::{MessageCard, palette};
use crate::tui::event::TuiEvent;
use crate::tui::render::RenderCache;
use crate::tui::window::{HeightCache, VirtualWindow};

/// Must be persisted in the parent TuiState.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub window: VirtualWindow,
    pub heights: HeightCache,
    pub render_cache: RenderCache,
    /// Bottom edge of each message in layout rows, rebuilt every frame.
    pub prefix_heights: Vec<u32>,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Keyboard selection (Cursor mode).
    pub selected_index: Option<usize>,
    /// Message under the mouse pointer.
    pub hovered_index: Option<usize>,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new(SegmentOptions::default())
    }
}

impl MessageListState {
    pub fn new(options: SegmentOptions) -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            window: VirtualWindow::default(),
            heights: HeightCache::new(),
            render_cache: RenderCache::new(RenderCache::DEFAULT_CAPACITY, options),
            prefix_heights: Vec::new(),
            stick_to_bottom: true,
            selected_index: None,
            hovered_index: None,
            viewport_height: 0,
        }
    }

    /// Forget scroll and selection (new or loaded chat). Caches stay; they
    /// are keyed by message id and content.
    pub fn reset_view(&mut self) {
        self.scroll_state = ScrollViewState::default();
        self.stick_to_bottom = true;
        self.selected_index = None;
        self.hovered_index = None;
    }

    fn total_height(&self) -> u32 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    fn max_scroll(&self) -> u16 {
        clamp_u16(self.total_height().saturating_sub(u32::from(self.viewport_height)))
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Re-engage auto-scroll once the user reaches the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Scroll so the selected message is fully visible, aligning its top
    /// when it is taller than the viewport.
    pub fn scroll_to_selected(&mut self) {
        let Some(idx) = self.selected_index else {
            return;
        };
        let Some(&bottom) = self.prefix_heights.get(idx) else {
            return;
        };
        let top = if idx == 0 { 0 } else { self.prefix_heights[idx - 1] };
        let offset = u32::from(self.scroll_state.offset().y);
        let viewport = u32::from(self.viewport_height);

        if top < offset {
            self.scroll_state.set_offset(Position { x: 0, y: clamp_u16(top) });
            self.stick_to_bottom = false;
        } else if bottom > offset + viewport {
            let new_y = clamp_u16(bottom.saturating_sub(viewport).min(top));
            self.scroll_state.set_offset(Position { x: 0, y: new_y });
            self.stick_to_bottom = new_y >= self.max_scroll();
        }
    }

    /// Message index at `content_y` rows from the top of the conversation.
    pub fn hit_test(&self, content_y: u32) -> Option<usize> {
        let idx = self.prefix_heights.partition_point(|&end| end <= content_y);
        (idx < self.prefix_heights.len()).then_some(idx)
    }

    pub fn select_previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let idx = self
            .selected_index
            .map_or(len - 1, |i| i.saturating_sub(1).min(len - 1));
        self.selected_index = Some(idx);
        self.scroll_to_selected();
    }

    pub fn select_next(&mut self, len: usize) {
        if let Some(i) = self.selected_index
            && i + 1 < len
        {
            self.selected_index = Some(i + 1);
            self.scroll_to_selected();
        }
    }

    /// Measure every message in `range` that has no valid cached height.
    fn measure(&mut self, messages: &[Message], range: std::ops::Range<usize>, width: u16) {
        for message in &messages[range] {
            if self.heights.get(message).is_some() {
                continue;
            }
            let (_, base_fg) = palette(message);
            let body = self
                .render_cache
                .get_or_render(message, base_fg, message.is_user_message);
            let height = MessageCard::calculate_height(&body, width);
            self.heights.insert(message, u32::from(height));
        }
    }

    fn rebuild_prefix_heights(&mut self, messages: &[Message]) {
        let window = self.window;
        let heights = &self.heights;
        self.prefix_heights = messages
            .iter()
            .scan(0u32, |acc, m| {
                *acc = acc.saturating_add(window.height_of(m, heights));
                Some(*acc)
            })
            .collect();
    }
}

fn clamp_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Scrollable conversation view component.
/// Created fresh each frame with references to state and data.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [Message],
    /// Message receiving a new variation, if one is generating.
    pub pending_variation: Option<&'a str>,
    /// Character name while a new reply is on its way.
    pub typing: Option<&'a str>,
    pub pulse_value: f32,
}

impl<'a> MessageList<'a> {
    pub fn new(state: &'a mut MessageListState, messages: &'a [Message]) -> Self {
        Self {
            state,
            messages,
            pending_variation: None,
            typing: None,
            pulse_value: 0.0,
        }
    }

    fn scroll_top(&self) -> u32 {
        if self.state.stick_to_bottom {
            self.state
                .total_height()
                .saturating_sub(u32::from(self.state.viewport_height))
        } else {
            u32::from(self.state.scroll_state.offset().y)
        }
    }
}

impl Component for MessageList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // scrollbar column
        let messages = self.messages;
        let container = u32::from(area.height);

        self.state.heights.set_width(content_width);
        self.state.heights.retain(messages);
        self.state.viewport_height = area.height;

        // Measuring can shift the window, so settle it twice before drawing.
        self.state.rebuild_prefix_heights(messages);
        for _ in 0..2 {
            let range = self.state.window.compute_visible_range(
                messages,
                self.scroll_top(),
                container,
                &self.state.heights,
            );
            self.state.measure(messages, range, content_width);
            self.state.rebuild_prefix_heights(messages);
        }
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let range = self.state.window.compute_visible_range(
            messages,
            self.scroll_top(),
            container,
            &self.state.heights,
        );
        self.state.measure(messages, range.clone(), content_width);
        self.state.rebuild_prefix_heights(messages);

        let typing_rows: u16 = if self.typing.is_some() { 2 } else { 0 };
        let canvas_height = clamp_u16(self.state.total_height()).saturating_add(typing_rows);
        let mut scroll_view = ScrollView::new(Size::new(content_width, canvas_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y = if range.start > 0 {
            self.state.prefix_heights[range.start - 1]
        } else {
            0
        };
        for i in range {
            let message = &messages[i];
            let height = self.state.prefix_heights[i] - y;
            let (_, base_fg) = palette(message);
            let body = self
                .state
                .render_cache
                .get_or_render(message, base_fg, message.is_user_message);

            let mut card = MessageCard::new(message, body);
            card.is_selected = self.state.selected_index == Some(i);
            card.is_hovered = self.state.hovered_index == Some(i);
            if self.pending_variation == Some(message.id.as_str()) {
                card.pulse_intensity = self.pulse_value;
            }
            let rect = Rect::new(0, clamp_u16(y), content_width, clamp_u16(height));
            scroll_view.render_widget(card, rect);
            y += height;
        }

        if let Some(name) = self.typing {
            let line = Line::styled(
                format!("  {name} is typing…"),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            );
            let rect = Rect::new(0, canvas_height.saturating_sub(1), content_width, 1);
            scroll_view.render_widget(line, rect);
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }
        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

/// Implemented on the state: the list itself is rebuilt every frame.
impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn chat(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user("Sam", format!("message {i}"))
                } else {
                    Message::character("Luna", format!("*nods* \"reply {i}\""))
                }
            })
            .collect()
    }

    fn draw(state: &mut MessageListState, messages: &[Message], width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| MessageList::new(state, messages).render(f, f.area()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn sticks_to_bottom_and_shows_latest() {
        let messages = chat(40);
        let mut state = MessageListState::default();
        let screen = draw(&mut state, &messages, 40, 12);
        assert!(screen.contains("reply 39"));
        assert!(!screen.contains("message 0 "));
    }

    #[test]
    fn only_the_window_is_measured() {
        let messages = chat(200);
        let mut state = MessageListState::default();
        draw(&mut state, &messages, 40, 12);
        assert!(state.heights.len() < messages.len());
        assert!(!state.heights.is_empty());
        // Every message is a 1-line card
        assert_eq!(state.heights.get(&messages[199]), Some(3));
    }

    #[test]
    fn hit_test_maps_rows_to_messages() {
        let mut state = MessageListState::default();
        state.prefix_heights = vec![3, 8, 10];
        assert_eq!(state.hit_test(0), Some(0));
        assert_eq!(state.hit_test(3), Some(1));
        assert_eq!(state.hit_test(9), Some(2));
        assert_eq!(state.hit_test(10), None);
    }

    #[test]
    fn selection_moves_and_unpins() {
        let mut state = MessageListState::default();
        state.prefix_heights = (1..=10).map(|i| i * 5).collect();
        state.viewport_height = 10;
        state
            .scroll_state
            .set_offset(Position { x: 0, y: 40 });

        state.select_previous(10);
        assert_eq!(state.selected_index, Some(9));
        state.select_previous(10);
        assert_eq!(state.selected_index, Some(8));
        state.select_next(10);
        state.select_next(10);
        assert_eq!(state.selected_index, Some(9));

        state.selected_index = Some(0);
        state.scroll_to_selected();
        assert_eq!(state.scroll_state.offset().y, 0);
        assert!(!state.stick_to_bottom);
    }

    #[test]
    fn scrolling_up_unpins_and_back_down_repins() {
        let messages = chat(40);
        let mut state = MessageListState::default();
        draw(&mut state, &messages, 40, 12);

        state.handle_event(&TuiEvent::ScrollPageUp);
        assert!(!state.stick_to_bottom);
        let y = state.max_scroll();
        state.scroll_state.set_offset(Position { x: 0, y });
        state.handle_event(&TuiEvent::ScrollDown);
        assert!(state.stick_to_bottom);
    }
}
