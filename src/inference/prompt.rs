//! # Prompt Building
//!
//! Turns a character, persona and chat history into the provider context.
//!
//! ```text
//! Context
//! ├── system:    character card + persona + reply mode + content rules
//! ├── assistant: greeting
//! ├── user:      ...
//! └── assistant: ...          // history up to the generation point
//! ```
//!
//! `{{char}}` and `{{user}}` (also `{{persona}}`) in card fields are replaced
//! with the character and persona names.

use crate::core::character::{Character, ContentRating, Persona};
use crate::core::message::Message;
use crate::inference::{Context, ReplyMode, Source};

/// Inputs for the system directive.
pub struct Prompt<'a> {
    pub character: &'a Character,
    pub persona: &'a Persona,
    pub mode: ReplyMode,
    /// User-configured instructions appended last.
    pub extra_instructions: Option<&'a str>,
}

pub fn substitute(text: &str, char_name: &str, persona_name: &str) -> String {
    text.replace("{{char}}", char_name)
        .replace("{{user}}", persona_name)
        .replace("{{persona}}", persona_name)
}

fn content_rules(rating: ContentRating) -> &'static str {
    match rating {
        ContentRating::General => {
            "Keep all content suitable for all ages. No violence beyond the mild, no romance beyond the innocent."
        }
        ContentRating::Teen => {
            "Mild violence, peril and light romance are fine. Nothing sexual or graphic."
        }
        ContentRating::Mature => {
            "Mature themes are allowed when the story calls for them. Stay tasteful and never sexualize minors."
        }
    }
}

pub fn build_directive(prompt: &Prompt<'_>) -> String {
    let character = prompt.character;
    let persona = prompt.persona;
    let sub = |text: &str| substitute(text, &character.name, &persona.name);

    let mut sections = vec![format!(
        "You are {}. Stay in character and reply only as {}, never as {}.",
        character.name, character.name, persona.name
    )];
    if !character.description.trim().is_empty() {
        sections.push(format!("# About {}\n{}", character.name, sub(character.description.trim())));
    }
    if !character.personality.trim().is_empty() {
        sections.push(format!("# Personality\n{}", sub(character.personality.trim())));
    }
    if !character.scenario.trim().is_empty() {
        sections.push(format!("# Scenario\n{}", sub(character.scenario.trim())));
    }
    if !persona.description.trim().is_empty() {
        sections.push(format!("# About {}\n{}", persona.name, sub(persona.description.trim())));
    }
    sections.push(format!("# Style\n{}", prompt.mode.instructions()));
    sections.push(format!(
        "# Content ({})\n{}",
        character.rating.label(),
        content_rules(character.rating)
    ));
    if let Some(extra) = prompt.extra_instructions.map(str::trim).filter(|e| !e.is_empty()) {
        sections.push(sub(extra));
    }
    sections.join("\n\n")
}

/// Build the full context. `history` should end at the generation point:
/// the whole chat for a new reply, or everything before the target message
/// when regenerating. System notices and media messages are left out.
pub fn build_context(prompt: &Prompt<'_>, history: &[Message]) -> Context {
    let mut context = Context::with_directive(build_directive(prompt));
    for message in history
        .iter()
        .filter(|m| !m.is_system && m.is_text() && !m.text().trim().is_empty())
    {
        let source = if message.is_user_message {
            Source::User
        } else {
            Source::Model
        };
        context.add(source, message.text());
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::MessageKind;

    fn prompt<'a>(character: &'a Character, persona: &'a Persona) -> Prompt<'a> {
        Prompt {
            character,
            persona,
            mode: ReplyMode::Roleplay,
            extra_instructions: None,
        }
    }

    #[test]
    fn placeholders_are_substituted() {
        assert_eq!(
            substitute("{{user}} meets {{char}}; {{persona}} smiles", "Luna", "Sam"),
            "Sam meets Luna; Sam smiles"
        );
    }

    #[test]
    fn directive_includes_card_mode_and_rating() {
        let luna = Character::companion();
        let sam = Persona {
            name: "Sam".to_string(),
            description: "Likes {{char}}'s tea.".to_string(),
        };
        let directive = build_directive(&prompt(&luna, &sam));
        assert!(directive.starts_with("You are Luna."));
        assert!(directive.contains("Sam wanders into Luna's late-night library café."));
        assert!(directive.contains("Likes Luna's tea."));
        assert!(directive.contains(ReplyMode::Roleplay.instructions()));
        assert!(directive.contains("# Content (General)"));
        assert!(!directive.contains("{{"));
    }

    #[test]
    fn extra_instructions_come_last() {
        let luna = Character::companion();
        let persona = Persona::default();
        let p = Prompt {
            extra_instructions: Some("  Keep {{char}} cheerful.  "),
            ..prompt(&luna, &persona)
        };
        assert!(build_directive(&p).ends_with("Keep Luna cheerful."));
    }

    #[test]
    fn history_maps_roles_and_skips_notices_and_media() {
        let luna = Character::companion();
        let persona = Persona::default();
        let history = vec![
            Message::greeting("Luna", "Hello!"),
            Message::user("You", "hi"),
            Message::system("Your message was blocked for safety reasons."),
            Message::media("You", MessageKind::Image, "cat.png", "look", true),
            Message::character("Luna", "*smiles*"),
        ];
        let context = build_context(&prompt(&luna, &persona), &history);

        let roles: Vec<Source> = context.items.iter().map(|s| s.source).collect();
        assert_eq!(
            roles,
            [Source::Directive, Source::Model, Source::User, Source::Model]
        );
        assert_eq!(context.items[2].content, "hi");
    }
}
