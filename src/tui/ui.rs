use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};

use crate::core::state::{App, GenerationTarget, PendingGeneration};
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{ChatList, MessageList, TitleBar};

/// Title bar, conversation, composer; the chat overlay on top when open.
pub fn layout(area: Rect, composer_height: u16) -> [Rect; 3] {
    use Constraint::{Length, Min};
    Layout::vertical([Length(1), Min(0), Length(composer_height)]).areas(area)
}

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    let composer_height = tui.composer.calculate_height(frame.area().width);
    let [title_area, main_area, input_area] = layout(frame.area(), composer_height);

    let typing = match &app.pending {
        Some(PendingGeneration {
            target: GenerationTarget::Reply(_),
            ..
        }) => Some(app.character.name.as_str()),
        _ => None,
    };
    let mut list = MessageList {
        state: &mut tui.message_list,
        messages: app.store.messages(),
        pending_variation: app.pending_variation_target(),
        typing,
        pulse_value: tui.pulse_value,
    };
    list.render(frame, main_area);

    let offset = tui.message_list.scroll_state.offset().y;
    let has_unseen_content = !tui.message_list.stick_to_bottom
        && u32::from(offset) + u32::from(main_area.height)
            < tui.message_list.prefix_heights.last().copied().unwrap_or(0);

    TitleBar {
        character_name: &app.character.name,
        mode: app.mode,
        model_name: &app.model_name,
        status_message: &app.status_message,
        has_unseen_content,
    }
    .render(frame, title_area);

    tui.composer.render(frame, input_area);

    if let Some(state) = tui.chat_list.as_mut() {
        ChatList { state }.render(frame, frame.area());
    }
}

/// Message index under screen row `screen_y`, if any.
pub fn hit_test_message(screen_y: u16, frame_area: Rect, composer_height: u16, tui: &TuiState) -> Option<usize> {
    let [_, main_area, _] = layout(frame_area, composer_height);
    if screen_y < main_area.y || screen_y >= main_area.y + main_area.height {
        return None;
    }
    let scroll = u32::from(tui.message_list.scroll_state.offset().y);
    tui.message_list
        .hit_test(u32::from(screen_y - main_area.y) + scroll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::{Action, update};
    use crate::test_support::test_app;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen(app: &App, tui: &mut TuiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw_ui(f, app, tui)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn draws_greeting_title_and_composer() {
        let app = test_app();
        let mut tui = TuiState::new(&app);
        let text = screen(&app, &mut tui);
        assert!(text.contains("Hello! I'm Luna."));
        assert!(text.contains("Luna · Roleplay · test-model"));
        assert!(text.contains("Message · Roleplay"));
    }

    #[test]
    fn typing_indicator_while_waiting_for_reply() {
        let mut app = test_app();
        update(&mut app, Action::Submit("hi".to_string()));
        let mut tui = TuiState::new(&app);
        let text = screen(&app, &mut tui);
        assert!(text.contains("Luna is typing…"));
    }

    #[test]
    fn hit_test_skips_title_row() {
        let app = test_app();
        let mut tui = TuiState::new(&app);
        screen(&app, &mut tui);
        let area = Rect::new(0, 0, 80, 24);
        assert_eq!(hit_test_message(0, area, 3, &tui), None);
        assert_eq!(hit_test_message(1, area, 3, &tui), Some(0));
        assert_eq!(hit_test_message(23, area, 3, &tui), None);
    }
}
