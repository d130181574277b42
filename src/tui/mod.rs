//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into `core::Action` values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event loop
//!
//! One thread owns `App`. Keys become actions and go through `update()`;
//! generations run on tokio tasks and report back over an mpsc channel as
//! `Action::GenerationFinished`. Effects returned by `update()` are carried
//! out here: spawning generations, scheduling a debounced save, quitting.
//!
//! ## Redraw Strategy
//!
//! - **Loading**: draws every ~80ms so the typing pulse animates.
//! - **Idle**: sleeps until an event, a pending save falls due, or 500ms pass.

mod component;
mod components;
mod event;
pub mod markdown;
pub mod render;
mod ui;
pub mod window;

use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use log::{debug, info, warn};

use crate::core::action::{Action, Effect, GenerationJob, update};
use crate::core::character::Character;
use crate::core::chats::{ChatSnapshot, ChatStore, save_logged, snapshot_chat};
use crate::core::config::ResolvedConfig;
use crate::core::debounce::Debouncer;
use crate::core::state::App;
use crate::inference::{
    CompletionProvider, CompletionRequest, LmStudioProvider, OpenRouterProvider, ProviderError,
    collect_reply,
};
use crate::tui::component::EventHandler;
use crate::tui::components::{ChatListEvent, ChatListState, Composer, ComposerEvent, MessageListState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const ANIMATION_TICK: Duration = Duration::from_millis(80);
const IDLE_TICK: Duration = Duration::from_millis(500);

/// Modal input mode: determines how keyboard events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Arrow keys move between messages; letters act on the selection.
    Cursor,
    /// Keys go to the composer. Esc switches to Cursor.
    Input,
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub composer: Composer,
    pub input_mode: InputMode,
    pub pulse_value: f32,
    /// Recent chats overlay (None = hidden)
    pub chat_list: Option<ChatListState>,
}

impl TuiState {
    pub fn new(app: &App) -> Self {
        Self {
            message_list: MessageListState::new(app.segment_options),
            composer: Composer::new(app.mode),
            input_mode: InputMode::Input,
            pulse_value: 0.0,
            chat_list: None,
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // The kitty protocol is ignored by terminals that lack it
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste
        );
    }
}

/// Build a provider from the resolved provider name and credentials.
pub fn build_provider(config: &ResolvedConfig) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    match config.provider.as_str() {
        "lmstudio" => Ok(Arc::new(LmStudioProvider::new(
            config.lmstudio_base_url.clone(),
        ))),
        _ => {
            let api_key = config.openrouter_api_key.clone().ok_or_else(|| {
                ProviderError::Config(
                    "OpenRouter API key missing: set it in ~/.hearth/config.toml, export OPENROUTER_API_KEY, or use --provider lmstudio"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(OpenRouterProvider::new(
                api_key,
                Some(config.openrouter_base_url.clone()),
            )))
        }
    }
}

/// Everything the loop needs besides `App` and `TuiState`.
struct Runtime {
    tx: mpsc::Sender<Action>,
    generation: Option<tokio::task::AbortHandle>,
    chats: Option<ChatStore>,
    saver: Debouncer<ChatSnapshot>,
}

impl Runtime {
    fn apply(&mut self, app: &mut App, action: Action) -> bool {
        let switches_chat = matches!(action, Action::NewChat | Action::LoadChat(_));
        if switches_chat {
            self.flush_save();
        }
        let effect = update(app, action);
        // Cancel, chat switches and deleting the prompt all void the generation
        if app.pending.is_none()
            && let Some(handle) = self.generation.take()
        {
            handle.abort();
        }

        match effect {
            Effect::None => {}
            Effect::SpawnGeneration(job) => {
                self.generation = Some(spawn_generation(job, app.provider.clone(), self.tx.clone()));
                self.schedule_save(app);
            }
            Effect::SaveChat => self.schedule_save(app),
            Effect::Quit => return true,
        }
        false
    }

    fn schedule_save(&mut self, app: &mut App) {
        if self.chats.is_some()
            && let Some(snapshot) = snapshot_chat(app)
        {
            self.saver.push(snapshot, Instant::now());
        }
    }

    fn poll_save(&mut self) {
        if let (Some(chats), Some(snapshot)) = (&self.chats, self.saver.poll(Instant::now())) {
            save_logged(chats, &snapshot);
        }
    }

    fn flush_save(&mut self) {
        if let (Some(chats), Some(snapshot)) = (&self.chats, self.saver.flush()) {
            save_logged(chats, &snapshot);
        }
    }
}

pub fn run(config: ResolvedConfig, character: Character) -> std::io::Result<()> {
    let provider = build_provider(&config).map_err(std::io::Error::other)?;
    let mut app = App::from_config(provider, character, &config);
    let mut tui = TuiState::new(&app);

    let chats = match ChatStore::open_default() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Chat history disabled: {e}");
            None
        }
    };

    let (tx, rx) = mpsc::channel();
    let mut rt = Runtime {
        tx,
        generation: None,
        chats,
        saver: Debouncer::new(config.save_debounce),
    };

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new()?;

    let start_time = Instant::now();
    let mut needs_redraw = true;

    'main: loop {
        tui.composer.mode = app.mode;
        tui.composer.dimmed = tui.input_mode == InputMode::Cursor || tui.chat_list.is_some();

        let animating = app.is_loading;
        if animating || needs_redraw {
            tui.pulse_value = (start_time.elapsed().as_secs_f32() * 5.0).sin() * 0.5 + 0.5;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        let mut timeout = if animating { ANIMATION_TICK } else { IDLE_TICK };
        if let Some(due) = rt.saver.time_until_due(Instant::now()) {
            timeout = timeout.min(due);
        }

        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            let frame_area = terminal.get_frame().area();
            if handle_event(event, &mut app, &mut tui, &mut rt, frame_area) {
                break 'main;
            }
        }

        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            if matches!(action, Action::GenerationFinished { .. }) {
                rt.generation = None;
            }
            if rt.apply(&mut app, action) {
                break 'main;
            }
        }

        rt.poll_save();
    }

    if let Some(handle) = rt.generation.take() {
        handle.abort();
    }
    rt.schedule_save(&mut app);
    rt.flush_save();

    ratatui::restore();
    Ok(())
}

/// Returns true when the app should quit.
fn handle_event(event: TuiEvent, app: &mut App, tui: &mut TuiState, rt: &mut Runtime, frame_area: ratatui::layout::Rect) -> bool {
    match event {
        TuiEvent::Resize => return false,
        TuiEvent::ForceQuit => return rt.apply(app, Action::Quit),
        TuiEvent::OpenChats => {
            if let Some(chats) = &rt.chats {
                let index = chats.load_index().unwrap_or_else(|e| {
                    warn!("Failed to read chat index: {e}");
                    Default::default()
                });
                tui.chat_list = Some(ChatListState::new(
                    &app.character.id,
                    &app.character.name,
                    index.chats,
                ));
            } else {
                app.status_message = "Chat history is unavailable".to_string();
            }
            return false;
        }
        _ => {}
    }

    if let Some(list) = tui.chat_list.as_mut() {
        let Some(chat_event) = list.handle_event(&event) else {
            return false;
        };
        return handle_chat_list_event(chat_event, app, tui, rt);
    }

    match event {
        TuiEvent::NewChat => {
            tui.composer.cancel_edit();
            tui.message_list.reset_view();
            return rt.apply(app, Action::NewChat);
        }
        TuiEvent::CycleMode => return rt.apply(app, Action::CycleMode),
        TuiEvent::MouseMove(_, row) => {
            let composer_height = tui.composer.calculate_height(frame_area.width);
            tui.message_list.hovered_index =
                ui::hit_test_message(row, frame_area, composer_height, tui);
            return false;
        }
        TuiEvent::MouseClick(_, row) => {
            let composer_height = tui.composer.calculate_height(frame_area.width);
            if let Some(idx) = ui::hit_test_message(row, frame_area, composer_height, tui) {
                tui.input_mode = InputMode::Cursor;
                tui.message_list.selected_index = Some(idx);
            }
            return false;
        }
        TuiEvent::ScrollUp | TuiEvent::ScrollDown | TuiEvent::ScrollPageUp | TuiEvent::ScrollPageDown => {
            tui.message_list.handle_event(&event);
            return false;
        }
        _ => {}
    }

    match tui.input_mode {
        InputMode::Input => handle_input_mode(event, app, tui, rt),
        InputMode::Cursor => handle_cursor_mode(event, app, tui, rt),
    }
}

fn handle_chat_list_event(event: ChatListEvent, app: &mut App, tui: &mut TuiState, rt: &mut Runtime) -> bool {
    match event {
        ChatListEvent::Open(id) => {
            tui.chat_list = None;
            // Flush first so the chat on disk is current if it's the one being opened
            rt.flush_save();
            let Some(chats) = &rt.chats else {
                return false;
            };
            match chats.load(&id, &app.persona.name) {
                Ok(chat) => {
                    tui.composer.cancel_edit();
                    tui.message_list.reset_view();
                    rt.apply(app, Action::LoadChat(chat))
                }
                Err(e) => {
                    warn!("Failed to load chat {id}: {e}");
                    app.status_message = format!("Couldn't open chat: {e}");
                    false
                }
            }
        }
        ChatListEvent::NewChat => {
            tui.chat_list = None;
            tui.composer.cancel_edit();
            tui.message_list.reset_view();
            rt.apply(app, Action::NewChat)
        }
        ChatListEvent::Delete(id) => {
            if let Some(chats) = &rt.chats {
                if let Err(e) = chats.delete(&id) {
                    warn!("Failed to delete chat {id}: {e}");
                }
                if app.current_chat_id.as_deref() == Some(id.as_str()) {
                    // The open chat stays on screen; the next change saves it anew
                    rt.saver.cancel();
                    app.current_chat_id = None;
                }
            }
            if let Some(list) = tui.chat_list.as_mut() {
                list.remove_chat(&id);
            }
            false
        }
        ChatListEvent::Dismiss => {
            tui.chat_list = None;
            false
        }
    }
}

fn handle_input_mode(event: TuiEvent, app: &mut App, tui: &mut TuiState, rt: &mut Runtime) -> bool {
    if event == TuiEvent::Escape {
        if tui.composer.cancel_edit().is_some() {
            app.status_message = "Edit cancelled".to_string();
        } else if app.is_loading {
            return rt.apply(app, Action::CancelGeneration);
        } else {
            tui.input_mode = InputMode::Cursor;
            let len = app.store.len();
            tui.message_list.selected_index = len.checked_sub(1);
        }
        return false;
    }

    match tui.composer.handle_event(&event) {
        Some(ComposerEvent::Submit(text)) => {
            tui.message_list.stick_to_bottom = true;
            rt.apply(app, Action::Submit(text))
        }
        Some(ComposerEvent::SaveEdit { id, text }) => rt.apply(app, Action::EditMessage { id, text }),
        Some(ComposerEvent::ContentChanged) | None => false,
    }
}

fn handle_cursor_mode(event: TuiEvent, app: &mut App, tui: &mut TuiState, rt: &mut Runtime) -> bool {
    let len = app.store.len();
    let selected_id = tui
        .message_list
        .selected_index
        .and_then(|i| app.store.messages().get(i))
        .map(|m| m.id.clone());

    let action = match (event, selected_id) {
        (TuiEvent::Escape, _) if app.is_loading => Action::CancelGeneration,
        (TuiEvent::Escape, _) => return false,
        (TuiEvent::CursorUp, _) => {
            tui.message_list.select_previous(len);
            return false;
        }
        (TuiEvent::CursorDown, _) => {
            tui.message_list.select_next(len);
            return false;
        }
        (TuiEvent::CursorLeft, Some(id)) => Action::PreviousVariation(id),
        (TuiEvent::CursorRight, Some(id)) => Action::NextVariation(id),
        (TuiEvent::InputChar('r'), Some(id)) => Action::Regenerate(id),
        (TuiEvent::InputChar('p'), Some(id)) => Action::TogglePin(id),
        (TuiEvent::InputChar('d'), Some(id)) => Action::DeleteMessage(id),
        (TuiEvent::InputChar('e'), Some(id)) => {
            let Some(message) = app.store.get(&id) else {
                return false;
            };
            if message.is_system || !message.is_text() {
                app.status_message = "Only text messages can be edited".to_string();
                return false;
            }
            tui.composer.begin_edit(id, message.text());
            tui.input_mode = InputMode::Input;
            return false;
        }
        (TuiEvent::Submit, _) => {
            tui.input_mode = InputMode::Input;
            tui.message_list.selected_index = None;
            return false;
        }
        // Typing anything else jumps back to the composer
        (event @ (TuiEvent::InputChar(_) | TuiEvent::Paste(_)), _) => {
            tui.input_mode = InputMode::Input;
            tui.message_list.selected_index = None;
            tui.composer.handle_event(&event);
            return false;
        }
        _ => return false,
    };

    let quit = rt.apply(app, action);
    // Deletions shrink the list under the selection
    let len = app.store.len();
    if let Some(i) = tui.message_list.selected_index
        && i >= len
    {
        tui.message_list.selected_index = len.checked_sub(1);
    }
    quit
}

/// Run a generation job off the UI thread. The result comes back as
/// `Action::GenerationFinished` carrying the job's request id.
fn spawn_generation(
    job: GenerationJob,
    provider: Arc<dyn CompletionProvider>,
    tx: mpsc::Sender<Action>,
) -> tokio::task::AbortHandle {
    info!(
        "Spawning generation {} via {} ({})",
        job.request_id,
        provider.name(),
        job.model
    );
    let handle = tokio::spawn(async move {
        let request = CompletionRequest {
            context: &job.context,
            model: &job.model,
            mode: job.mode,
            max_output_tokens: Some(job.max_output_tokens),
        };
        let started = Instant::now();
        let result = collect_reply(provider.as_ref(), request)
            .await
            .map_err(|e| e.to_string());
        debug!(
            "Generation {} finished in {}ms (ok: {})",
            job.request_id,
            started.elapsed().as_millis(),
            result.is_ok()
        );
        if tx
            .send(Action::GenerationFinished {
                request_id: job.request_id,
                result,
            })
            .is_err()
        {
            warn!("Failed to deliver generation {}: receiver dropped", job.request_id);
        }
    });
    handle.abort_handle()
}
