//! # Safety Filter
//!
//! Screens user input before it is appended or sent for generation.
//! A blocked message never reaches the store; the reducer posts a system
//! notice instead.

use log::info;

use crate::core::character::ContentRating;

pub trait SafetyCheck: Send + Sync {
    /// True when `text` may be sent in a chat with the given rating.
    fn check(&self, text: &str, rating: ContentRating) -> bool;
}

/// Terms blocked regardless of the character's rating.
const ALWAYS_BLOCKED: &[&str] = &["csam", "pedophile", "pedophilia", "underage"];

/// Terms allowed only for characters rated mature.
const MATURE_ONLY: &[&str] = &["gore", "nsfw", "nude", "explicit", "sex"];

/// Case-insensitive whole-word filter.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    always: Vec<String>,
    mature_only: Vec<String>,
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl KeywordFilter {
    /// Built-in lists plus `extra_terms`, which are blocked at every rating.
    pub fn new(extra_terms: Vec<String>) -> Self {
        let mut always: Vec<String> = ALWAYS_BLOCKED.iter().map(|t| t.to_string()).collect();
        always.extend(
            extra_terms
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        );
        Self {
            always,
            mature_only: MATURE_ONLY.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn matched_term<'a>(&'a self, text: &str, rating: ContentRating) -> Option<&'a str> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let hit = |terms: &'a [String]| {
            terms
                .iter()
                .find(|term| contains_phrase(&words, term))
                .map(String::as_str)
        };

        hit(&self.always).or_else(|| {
            if rating == ContentRating::Mature {
                None
            } else {
                hit(&self.mature_only)
            }
        })
    }
}

/// Whole-word match; multi-word terms must appear as consecutive words.
fn contains_phrase(words: &[String], term: &str) -> bool {
    let parts: Vec<&str> = term.split_whitespace().collect();
    if parts.is_empty() || parts.len() > words.len() {
        return false;
    }
    words
        .windows(parts.len())
        .any(|window| window.iter().zip(&parts).all(|(w, p)| w == p))
}

impl SafetyCheck for KeywordFilter {
    fn check(&self, text: &str, rating: ContentRating) -> bool {
        match self.matched_term(text, rating) {
            Some(term) => {
                info!("Safety filter blocked input (term '{term}', rating {})", rating.label());
                false
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_text_passes() {
        let filter = KeywordFilter::default();
        assert!(filter.check("Could I have some chamomile tea?", ContentRating::General));
    }

    #[test]
    fn matching_is_whole_word_and_case_insensitive() {
        let filter = KeywordFilter::default();
        assert!(!filter.check("This is NSFW stuff", ContentRating::General));
        // "sextant" and "Essex" contain the term but not as a word.
        assert!(filter.check("Hand me the sextant, we sail for Essex", ContentRating::General));
    }

    #[test]
    fn mature_rating_unlocks_mature_terms_only() {
        let filter = KeywordFilter::default();
        assert!(filter.check("the battle was full of gore", ContentRating::Mature));
        assert!(!filter.check("the battle was full of gore", ContentRating::Teen));
        assert!(!filter.check("underage", ContentRating::Mature));
    }

    #[test]
    fn extra_terms_block_at_every_rating() {
        let filter = KeywordFilter::new(vec!["  Forbidden Word ".to_string(), String::new()]);
        assert!(!filter.check("say the forbidden word now", ContentRating::Mature));
        assert!(filter.check("forbidden, the word", ContentRating::General));
    }
}
