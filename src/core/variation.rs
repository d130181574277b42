//! # Variation Navigation
//!
//! Each message slot can hold alternative responses. The state is
//! `(variations, current index)`; no variations means a single fixed response.
//!
//! ```text
//!            Previous                  Next
//!   [1] ──── clamps ────┐     ┌──── at end: generate ──── [n+1]
//!    ▲                  │     │                             │
//!    └── 1 .. i-1 ◀─────┴─ i ─┴─────▶ i+1 .. n ◀────────────┘
//! ```
//!
//! Browsing backwards stops at the original; browsing forwards past the last
//! alternative asks for a fresh one. Generation itself is async, so `next`
//! only reports [`Navigation::NeedsGeneration`]; the caller regenerates and
//! later calls [`push_variation`] with the result.

use crate::core::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The shown alternative changed to this 1-based index.
    Moved(usize),
    /// Previous at the first alternative (or nothing to browse). No change.
    AtStart,
    /// Next at the last alternative. The caller must regenerate.
    NeedsGeneration,
}

/// Append a regenerated response and show it.
///
/// The current text becomes alternative #1 when this is the first
/// regeneration for the slot.
pub fn push_variation(message: &mut Message, text: impl Into<String>) {
    let text = text.into();
    let (variations, index, active) = message.variations_mut();
    let list = variations.get_or_insert_with(|| vec![active.clone()]);
    list.push(text);
    let newest = list.len();
    *index = Some(newest);
    active.clone_from(&list[newest - 1]);
}

/// Show the previous alternative; no-op at the first one.
pub fn previous(message: &mut Message) -> Navigation {
    let (variations, index, active) = message.variations_mut();
    let (Some(list), Some(current)) = (variations.as_ref(), *index) else {
        return Navigation::AtStart;
    };
    if current <= 1 {
        return Navigation::AtStart;
    }
    let target = current - 1;
    *index = Some(target);
    active.clone_from(&list[target - 1]);
    Navigation::Moved(target)
}

/// Show the next alternative, or report that a new one must be generated.
pub fn next(message: &mut Message) -> Navigation {
    let (variations, index, active) = message.variations_mut();
    let (Some(list), Some(current)) = (variations.as_ref(), *index) else {
        return Navigation::NeedsGeneration;
    };
    if current >= list.len() {
        return Navigation::NeedsGeneration;
    }
    let target = current + 1;
    *index = Some(target);
    active.clone_from(&list[target - 1]);
    Navigation::Moved(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> Message {
        Message::character("Luna", text)
    }

    fn assert_consistent(msg: &Message) {
        if let Some(list) = msg.variations() {
            let index = msg.current_variation_index().unwrap();
            assert!((1..=list.len()).contains(&index));
            assert_eq!(msg.text(), list[index - 1]);
        }
    }

    #[test]
    fn first_regeneration_keeps_original_at_index_one() {
        let mut msg = reply("Hi there!");
        push_variation(&mut msg, "Hey you!");
        assert_eq!(msg.variations().unwrap(), ["Hi there!", "Hey you!"]);
        assert_eq!(msg.current_variation_index(), Some(2));
        assert_eq!(msg.text(), "Hey you!");
        assert_consistent(&msg);
    }

    #[test]
    fn regeneration_appends_even_from_earlier_index() {
        let mut msg = reply("a");
        push_variation(&mut msg, "b");
        push_variation(&mut msg, "c");
        previous(&mut msg);
        previous(&mut msg);
        push_variation(&mut msg, "d");
        assert_eq!(msg.variations().unwrap(), ["a", "b", "c", "d"]);
        assert_eq!(msg.current_variation_index(), Some(4));
        assert_consistent(&msg);
    }

    #[test]
    fn previous_clamps_at_first() {
        let mut msg = reply("a");
        assert_eq!(previous(&mut msg), Navigation::AtStart);
        assert_eq!(msg.text(), "a");

        push_variation(&mut msg, "b");
        assert_eq!(previous(&mut msg), Navigation::Moved(1));
        let before = msg.clone();
        assert_eq!(previous(&mut msg), Navigation::AtStart);
        assert_eq!(msg, before);
    }

    #[test]
    fn next_moves_within_known_variations() {
        let mut msg = reply("a");
        push_variation(&mut msg, "b");
        previous(&mut msg);
        assert_eq!(next(&mut msg), Navigation::Moved(2));
        assert_eq!(msg.text(), "b");
        assert_consistent(&msg);
    }

    #[test]
    fn next_at_end_requests_generation_without_changes() {
        let mut msg = reply("a");
        assert_eq!(next(&mut msg), Navigation::NeedsGeneration);
        assert!(msg.variations().is_none());

        push_variation(&mut msg, "b");
        let before = msg.clone();
        assert_eq!(next(&mut msg), Navigation::NeedsGeneration);
        assert_eq!(msg, before);

        // Applying the generated text advances to the new length.
        push_variation(&mut msg, "c");
        assert_eq!(msg.current_variation_index(), Some(3));
        assert_eq!(msg.text(), "c");
    }

    #[test]
    fn browse_forward_is_unbounded_backward_is_bounded() {
        let mut msg = reply("v1");
        for n in 2..=5 {
            assert_eq!(next(&mut msg), Navigation::NeedsGeneration);
            push_variation(&mut msg, format!("v{n}"));
            assert_consistent(&msg);
        }
        for expected in (1..=4).rev() {
            assert_eq!(previous(&mut msg), Navigation::Moved(expected));
        }
        assert_eq!(previous(&mut msg), Navigation::AtStart);
        assert_eq!(msg.text(), "v1");
    }
}
