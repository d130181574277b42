//! Markup → ratatui `Text` renderer.
//!
//! Used for chat messages that carry links or images, where roleplay
//! segmentation would mangle the brackets. Handles paragraphs, emphasis,
//! strong, strikethrough, inline code, lists, links, autolinks and images.

use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

/// Parse markup into styled `Text` with `base_fg` as the body colour.
pub fn render(content: &str, base_fg: Color) -> Text<'static> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);

    let mut w = Writer::new(base_fg);
    for event in Parser::new_ext(content, opts) {
        w.handle(event);
    }
    w.text
}

fn link_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::UNDERLINED)
}

/// What to print once a link or image closes.
enum Trailer {
    /// `[text](url)`: the url follows the text.
    Url(String),
    /// Autolinks already show their url as the text.
    Nothing,
    /// Images show `[image: alt] url`.
    Image(String),
}

struct Writer {
    text: Text<'static>,
    base_fg: Color,
    /// Inline style stack; styles compose via `patch`.
    styles: Vec<Style>,
    /// None = bullet list, Some(n) = ordered list at n.
    list_indices: Vec<Option<u64>>,
    trailers: Vec<Trailer>,
    needs_newline: bool,
}

impl Writer {
    fn new(base_fg: Color) -> Self {
        Self {
            text: Text::default(),
            base_fg,
            styles: vec![],
            list_indices: vec![],
            trailers: vec![],
            needs_newline: false,
        }
    }

    fn style(&self) -> Style {
        self.styles
            .last()
            .copied()
            .unwrap_or_else(|| Style::default().fg(self.base_fg))
    }

    fn push_style(&mut self, overlay: Style) {
        self.styles.push(self.style().patch(overlay));
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn push_line(&mut self, line: Line<'static>) {
        self.text.lines.push(line);
    }

    fn push_span(&mut self, span: Span<'static>) {
        match self.text.lines.last_mut() {
            Some(line) => line.push_span(span),
            None => self.push_line(Line::from(vec![span])),
        }
    }

    fn blank_line_if_needed(&mut self) {
        if self.needs_newline {
            self.push_line(Line::default());
            self.needs_newline = false;
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.text(t),
            Event::Code(c) => {
                let style = Style::default().fg(Color::White).bg(Color::DarkGray);
                self.push_span(Span::styled(c.to_string(), style));
            }
            Event::SoftBreak => self.push_span(Span::raw(" ")),
            Event::HardBreak => self.push_line(Line::default()),
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.blank_line_if_needed();
                self.push_line(Line::default());
            }
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.blank_line_if_needed();
                }
                self.list_indices.push(start);
            }
            Tag::Item => {
                self.push_line(Line::default());
                let indent = "  ".repeat(self.list_indices.len().saturating_sub(1));
                if let Some(idx) = self.list_indices.last_mut() {
                    let marker = match idx {
                        None => format!("{indent}- "),
                        Some(n) => {
                            let s = format!("{indent}{n}. ");
                            *n += 1;
                            s
                        }
                    };
                    self.push_span(Span::styled(marker, Style::default().fg(Color::DarkGray)));
                }
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => {
                let trailer = match link_type {
                    LinkType::Autolink | LinkType::Email => Trailer::Nothing,
                    _ => Trailer::Url(dest_url.to_string()),
                };
                self.trailers.push(trailer);
                self.push_style(link_style());
            }
            Tag::Image { dest_url, .. } => {
                self.trailers.push(Trailer::Image(dest_url.to_string()));
                let style = Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::ITALIC);
                self.push_span(Span::styled("[image: ", style));
                self.push_style(style);
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.needs_newline = true,
            TagEnd::List(_) => {
                self.list_indices.pop();
                self.needs_newline = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link | TagEnd::Image => {
                let style = self.style();
                self.pop_style();
                match self.trailers.pop() {
                    Some(Trailer::Url(url)) => {
                        self.push_span(Span::raw(" ("));
                        self.push_span(Span::styled(url, link_style()));
                        self.push_span(Span::raw(")"));
                    }
                    Some(Trailer::Image(url)) => {
                        self.push_span(Span::styled("] ", style));
                        self.push_span(Span::styled(url, link_style()));
                    }
                    Some(Trailer::Nothing) | None => {}
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, cow: CowStr<'_>) {
        // ratatui renders \t as zero-width
        let text = cow.replace('\t', "    ");
        let style = self.style();
        self.push_span(Span::styled(text, style));
    }
}
