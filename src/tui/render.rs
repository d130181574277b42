//! # Segment Rendering
//!
//! Turns a message into styled `Text` for its card.
//!
//! ```text
//! *waves* "Hello!" (is she real?)
//!    │        │          │
//!  action  dialogue   thought
//!  italic    bold     italic+dim
//! ```
//!
//! Fixed colours never depend on the terminal theme. In user messages the
//! dialogue and narration spans carry no foreground and inherit the card's.

use std::collections::HashMap;
use std::sync::LazyLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use regex::Regex;

use crate::core::message::{Message, MessageKind};
use crate::core::segment::{SegmentKind, SegmentOptions, TextSegment, segment_with};
use crate::tui::markdown;

pub const ACTION_FG: Color = Color::Gray;
pub const THOUGHT_FG: Color = Color::DarkGray;
pub const SPEECH_FG: Color = Color::White;
pub const SYSTEM_FG: Color = Color::Yellow;

/// `[..](..)`, `![..](..)` and `<scheme://..>` autolinks.
static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!?\[[^\]]*\]\([^)\s]+\)|<[a-zA-Z][a-zA-Z0-9+.-]*://[^>\s]+>").unwrap()
});

pub fn has_markup(text: &str) -> bool {
    MARKUP.is_match(text)
}

pub fn segment_style(kind: SegmentKind, is_user: bool) -> Style {
    match kind {
        SegmentKind::Action => Style::default().fg(ACTION_FG).add_modifier(Modifier::ITALIC),
        SegmentKind::Thought => Style::default()
            .fg(THOUGHT_FG)
            .add_modifier(Modifier::ITALIC | Modifier::DIM),
        SegmentKind::Dialogue if is_user => Style::default().add_modifier(Modifier::BOLD),
        SegmentKind::Dialogue => Style::default().fg(SPEECH_FG).add_modifier(Modifier::BOLD),
        SegmentKind::Narration if is_user => Style::default(),
        SegmentKind::Narration => Style::default().fg(SPEECH_FG),
    }
}

/// Lay segments out as spans. A single space separates neighbours of
/// different kinds; a newline inside a segment starts a new line.
pub fn render_segments(segments: &[TextSegment], is_user: bool) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = vec![Line::default()];
    let mut previous: Option<SegmentKind> = None;

    for seg in segments {
        if previous.is_some_and(|kind| kind != seg.kind) {
            push_span(&mut lines, Span::raw(" "));
        }
        let style = segment_style(seg.kind, is_user);
        for (i, piece) in seg.content.split('\n').enumerate() {
            if i > 0 {
                lines.push(Line::default());
            }
            if !piece.is_empty() {
                push_span(&mut lines, Span::styled(piece.to_string(), style));
            }
        }
        previous = Some(seg.kind);
    }

    if segments.is_empty() {
        lines.clear();
    }
    Text::from(lines)
}

fn push_span(lines: &mut Vec<Line<'static>>, span: Span<'static>) {
    if let Some(line) = lines.last_mut() {
        line.push_span(span);
    }
}

fn media_node(kind: MessageKind, url: &str, caption: &str, base_fg: Color) -> Text<'static> {
    let label = match kind {
        MessageKind::Voice => "[voice] ",
        _ => "[image] ",
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(label, Style::default().fg(base_fg).add_modifier(Modifier::BOLD)),
        Span::styled(
            url.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        ),
    ])];
    lines.extend(
        caption
            .lines()
            .map(|l| Line::styled(l.to_string(), Style::default().fg(base_fg))),
    );
    Text::from(lines)
}

/// Render one message body. Media messages become a media node, text with
/// link or image markup goes through the markup renderer, system notices
/// stay plain, everything else is segmented.
pub fn render_message(
    message: &Message,
    base_fg: Color,
    is_user: bool,
    options: SegmentOptions,
) -> Text<'static> {
    let text = message.text();
    if !message.is_text() {
        let url = message.media_url.as_deref().unwrap_or_default();
        return media_node(message.kind, url, text.trim(), base_fg);
    }
    if message.is_system {
        return Text::styled(
            text.trim().to_string(),
            Style::default().fg(SYSTEM_FG).add_modifier(Modifier::ITALIC),
        );
    }
    if has_markup(text) {
        return markdown::render(text, base_fg);
    }
    render_segments(&segment_with(text, options), is_user)
}

type CacheKey = (String, Color, bool);

/// Memoized `render_message` results, keyed by content, colour and
/// user flag. Cleared wholesale once `capacity` entries are held.
pub struct RenderCache {
    capacity: usize,
    options: SegmentOptions,
    entries: HashMap<CacheKey, Text<'static>>,
}

impl RenderCache {
    pub const DEFAULT_CAPACITY: usize = 512;

    pub fn new(capacity: usize, options: SegmentOptions) -> Self {
        Self {
            capacity: capacity.max(1),
            options,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_options(&mut self, options: SegmentOptions) {
        if self.options != options {
            self.options = options;
            self.entries.clear();
        }
    }

    pub fn get_or_render(&mut self, message: &Message, base_fg: Color, is_user: bool) -> Text<'static> {
        let key = (cache_content(message), base_fg, is_user);
        if let Some(text) = self.entries.get(&key) {
            return text.clone();
        }
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        let text = render_message(message, base_fg, is_user, self.options);
        self.entries.insert(key, text.clone());
        text
    }
}

/// Everything that changes the rendered output besides colour and side.
fn cache_content(message: &Message) -> String {
    match (message.kind, message.is_system) {
        (MessageKind::Text, false) => message.text().to_string(),
        (MessageKind::Text, true) => format!("system\n{}", message.text()),
        (kind, _) => format!(
            "{kind:?}\n{}\n{}",
            message.media_url.as_deref().unwrap_or_default(),
            message.text()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::segment;

    fn plain(text: &Text<'_>) -> Vec<String> {
        text.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn kinds_get_distinct_styles() {
        let text = render_segments(&segment(r#"*wave* "Hello!" (nervous)"#), false);
        let spans = &text.lines[0].spans;
        let contents: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(contents, ["wave", " ", "Hello!", " ", "nervous"]);

        assert!(spans[0].style.add_modifier.contains(Modifier::ITALIC));
        assert_eq!(spans[0].style.fg, Some(ACTION_FG));
        assert!(spans[2].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[2].style.fg, Some(SPEECH_FG));
        assert!(spans[4].style.add_modifier.contains(Modifier::DIM));
        assert_eq!(spans[4].style.fg, Some(THOUGHT_FG));
    }

    #[test]
    fn same_kind_neighbours_have_no_separator() {
        let text = render_segments(&segment("*one* *two*"), false);
        assert_eq!(plain(&text), ["onetwo"]);
    }

    #[test]
    fn user_dialogue_and_narration_inherit_colour() {
        let text = render_segments(&segment(r#"I nod. "Sure.""#), true);
        let spans = &text.lines[0].spans;
        assert_eq!(spans[0].style.fg, None);
        assert_eq!(spans[2].style.fg, None);
        assert!(spans[2].style.add_modifier.contains(Modifier::BOLD));
        // actions keep their fixed colour on either side
        let action = render_segments(&segment("*nods*"), true);
        assert_eq!(action.lines[0].spans[0].style.fg, Some(ACTION_FG));
    }

    #[test]
    fn newlines_start_new_lines() {
        let text = render_segments(&segment("First line.\nSecond line."), false);
        assert_eq!(plain(&text), ["First line.", "Second line."]);
    }

    #[test]
    fn no_segments_render_nothing() {
        assert!(render_segments(&[], false).lines.is_empty());
    }

    #[test]
    fn markup_bypasses_segmentation() {
        let msg = Message::character("Luna", "Look: ![the moon](moon.png) *smiles*");
        let text = render_message(&msg, Color::White, false, SegmentOptions::default());
        let joined = plain(&text).join("\n");
        assert!(joined.contains("[image: the moon] moon.png"));
        assert!(has_markup("<https://example.com>"));
        assert!(!has_markup("*waves* (hello)"));
    }

    #[test]
    fn media_message_renders_node() {
        let msg = Message::media("Sam", MessageKind::Voice, "memo.ogg", "", true);
        let text = render_message(&msg, Color::Green, true, SegmentOptions::default());
        assert_eq!(plain(&text), ["[voice] memo.ogg"]);
    }

    #[test]
    fn cache_reuses_and_clears_when_full() {
        let mut cache = RenderCache::new(2, SegmentOptions::default());
        let a = Message::character("Luna", "*a*");
        let b = Message::character("Luna", "*b*");
        let c = Message::character("Luna", "*c*");

        cache.get_or_render(&a, Color::White, false);
        cache.get_or_render(&a, Color::White, false);
        assert_eq!(cache.len(), 1);
        cache.get_or_render(&b, Color::White, false);
        assert_eq!(cache.len(), 2);
        cache.get_or_render(&c, Color::White, false);
        assert_eq!(cache.len(), 1);

        cache.set_options(SegmentOptions {
            resolve_overlaps: true,
        });
        assert!(cache.is_empty());
    }
}
