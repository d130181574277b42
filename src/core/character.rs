//! # Characters and Personas
//!
//! A character card is the other side of the conversation; the persona is
//! the user's side. Cards load from JSON or TOML files.

use std::fmt;
use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

/// Content rating of a character card. Drives the safety filter and the
/// content rules in the system prompt.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentRating {
    #[default]
    General,
    Teen,
    Mature,
}

impl ContentRating {
    pub fn label(self) -> &'static str {
        match self {
            ContentRating::General => "General",
            ContentRating::Teen => "Teen",
            ContentRating::Mature => "Mature",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Character {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Short introduction shown to the user (also `intro` in older cards).
    #[serde(default, alias = "intro")]
    pub description: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub rating: ContentRating,
    #[serde(default, alias = "image")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Character {
    /// Text of the opening message: the configured greeting, or a generic
    /// introduction when the card has none.
    pub fn greeting_text(&self) -> String {
        match self.greeting.as_deref().map(str::trim) {
            Some(greeting) if !greeting.is_empty() => greeting.to_string(),
            _ => format!("Hello! I'm {}. How are you today?", self.name),
        }
    }

    /// Built-in companion used when no card is given.
    pub fn companion() -> Self {
        Self {
            id: "luna".to_string(),
            name: "Luna".to_string(),
            description: "A warm, curious librarian who loves stories.".to_string(),
            personality: "Gentle, playful, observant. Speaks softly and notices small details."
                .to_string(),
            scenario: "{{user}} wanders into {{char}}'s late-night library café.".to_string(),
            greeting: Some(
                "*looks up from a stack of books and smiles* \"Oh! Hello there. I'm Luna. Can I get you some tea?\""
                    .to_string(),
            ),
            rating: ContentRating::General,
            avatar: None,
            tags: vec!["cozy".to_string(), "slice of life".to_string()],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Persona {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "You".to_string(),
            description: String::new(),
        }
    }
}

#[derive(Debug)]
pub enum CharacterError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Toml(toml::de::Error),
    /// The card parsed but has no usable name.
    MissingName,
}

impl fmt::Display for CharacterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterError::Io(e) => write!(f, "character card I/O error: {e}"),
            CharacterError::Json(e) => write!(f, "character card JSON error: {e}"),
            CharacterError::Toml(e) => write!(f, "character card TOML error: {e}"),
            CharacterError::MissingName => write!(f, "character card has no name"),
        }
    }
}

impl std::error::Error for CharacterError {}

/// Parse a card from a string. `.toml` cards are TOML, anything else JSON.
pub fn parse_character(contents: &str, is_toml: bool) -> Result<Character, CharacterError> {
    let mut character: Character = if is_toml {
        toml::from_str(contents).map_err(CharacterError::Toml)?
    } else {
        serde_json::from_str(contents).map_err(CharacterError::Json)?
    };

    character.name = character.name.trim().to_string();
    if character.name.is_empty() {
        return Err(CharacterError::MissingName);
    }
    if character.id.is_empty() {
        character.id = slug(&character.name);
    }
    Ok(character)
}

pub fn load_character(path: &Path) -> Result<Character, CharacterError> {
    let contents = fs::read_to_string(path).map_err(CharacterError::Io)?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let character = parse_character(&contents, is_toml)?;
    info!("Loaded character '{}' from {}", character.name, path.display());
    Ok(character)
}

/// Lowercase, dash-separated id derived from a name.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}
