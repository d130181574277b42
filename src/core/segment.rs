//! # Text Segmentation
//!
//! Splits roleplay text into typed spans:
//!
//! ```text
//! Hi. *waves* "Hello!" (nervous)
//! └┬┘ └──┬──┘ └───┬──┘ └───┬───┘
//! narration action dialogue thought
//! ```
//!
//! Five patterns run independently over the whole string. Their matches are
//! merged by start offset and walked left to right; whatever falls between
//! matches is narration. Overlapping matches (`*"text"*`, `**bold**`) are all
//! kept unless [`SegmentOptions::resolve_overlaps`] is set.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Action,
    Dialogue,
    Thought,
    Narration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub kind: SegmentKind,
    /// Inner text, delimiters stripped and trimmed.
    pub content: String,
    /// The raw matched substring, delimiters included.
    pub original: String,
}

impl TextSegment {
    fn new(kind: SegmentKind, content: &str, original: &str) -> Self {
        Self {
            kind,
            content: content.to_string(),
            original: original.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentOptions {
    /// Drop a match whose span lies entirely inside an already accepted match.
    /// Off by default, which keeps every overlapping match.
    pub resolve_overlaps: bool,
}

/// Declaration order doubles as the tie-break for equal start offsets.
static PATTERNS: LazyLock<[(SegmentKind, Regex); 5]> = LazyLock::new(|| {
    [
        (SegmentKind::Action, Regex::new(r"\*\*(.*?)\*\*").unwrap()),
        (SegmentKind::Action, Regex::new(r"\*([^*]+)\*").unwrap()),
        (SegmentKind::Dialogue, Regex::new(r#""([^"]+)""#).unwrap()),
        (SegmentKind::Dialogue, Regex::new(r"'([^']+)'").unwrap()),
        (SegmentKind::Thought, Regex::new(r"\(([^)]+)\)").unwrap()),
    ]
});

struct Span<'a> {
    kind: SegmentKind,
    start: usize,
    end: usize,
    inner: &'a str,
    original: &'a str,
}

/// Segment with default options. Accepts `&str` or `Option<&str>`.
pub fn segment<'a>(content: impl Into<Option<&'a str>>) -> Vec<TextSegment> {
    segment_with(content, SegmentOptions::default())
}

pub fn segment_with<'a>(
    content: impl Into<Option<&'a str>>,
    options: SegmentOptions,
) -> Vec<TextSegment> {
    let Some(content) = content.into() else {
        return Vec::new();
    };
    if content.is_empty() {
        return Vec::new();
    }

    let mut spans = collect_spans(content);
    // Vec::sort_by_key is stable: ties keep pattern order.
    spans.sort_by_key(|span| span.start);

    if spans.is_empty() {
        let trimmed = content.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![TextSegment::new(SegmentKind::Narration, trimmed, content)]
        };
    }

    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut accepted_end = 0;

    for span in spans {
        if options.resolve_overlaps && span.end <= accepted_end {
            continue;
        }

        if span.start > cursor {
            push_narration(&mut segments, &content[cursor..span.start]);
        }

        let inner = span.inner.trim();
        if !inner.is_empty() {
            segments.push(TextSegment::new(span.kind, inner, span.original));
        }

        cursor = cursor.max(span.end);
        accepted_end = accepted_end.max(span.end);
    }

    if cursor < content.len() {
        push_narration(&mut segments, &content[cursor..]);
    }

    segments
}

fn collect_spans(content: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    for (kind, pattern) in PATTERNS.iter() {
        for caps in pattern.captures_iter(content) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            spans.push(Span {
                kind: *kind,
                start: whole.start(),
                end: whole.end(),
                inner: inner.as_str(),
                original: whole.as_str(),
            });
        }
    }
    spans
}

fn push_narration(segments: &mut Vec<TextSegment>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(TextSegment::new(SegmentKind::Narration, trimmed, raw));
    }
}
