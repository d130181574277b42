use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Source {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Model,
    #[serde(rename = "system")]
    Directive,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContextSegment {
    #[serde(rename = "role")]
    pub source: Source,
    pub content: String,
}

/// Replace typographic double quotes, dashes and ellipses with ASCII so the
/// dialogue pattern sees plain `"` pairs. Curly apostrophes are left alone:
/// turning them into `'` would pair contractions up as dialogue.
pub fn normalize_typography(text: &str) -> String {
    text.replace(['“', '”'], "\"")
        .replace('—', "--")
        .replace('…', "...")
}

/// The model input: an ordered list of role-tagged segments.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Context {
    pub items: Vec<ContextSegment>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context opening with a system directive.
    pub fn with_directive(directive: impl Into<String>) -> Self {
        let mut context = Self::new();
        context.add(Source::Directive, directive);
        context
    }

    pub fn add(&mut self, source: Source, content: impl Into<String>) -> &ContextSegment {
        self.items.push(ContextSegment {
            source,
            content: content.into(),
        });
        &self.items[self.items.len() - 1]
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) -> &ContextSegment {
        self.add(Source::User, content)
    }

    /// The directive, if the context opens with one.
    pub fn directive(&self) -> Option<&str> {
        self.items
            .first()
            .filter(|seg| seg.source == Source::Directive)
            .map(|seg| seg.content.as_str())
    }
}

/// How the character should write its replies.
/// Shapes the directive and the sampling temperature.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// Short, chatty messages with little narration.
    Casual,
    /// Actions in asterisks, dialogue in quotes (default)
    #[default]
    Roleplay,
    /// Longer prose-style narration.
    Story,
}

impl ReplyMode {
    /// Cycles to the next mode (wraps around)
    pub fn next(self) -> ReplyMode {
        match self {
            ReplyMode::Casual => ReplyMode::Roleplay,
            ReplyMode::Roleplay => ReplyMode::Story,
            ReplyMode::Story => ReplyMode::Casual,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReplyMode::Casual => "Casual",
            ReplyMode::Roleplay => "Roleplay",
            ReplyMode::Story => "Story",
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            ReplyMode::Casual => 0.7,
            ReplyMode::Roleplay => 0.9,
            ReplyMode::Story => 1.0,
        }
    }

    /// Style rules added to the system directive.
    pub fn instructions(self) -> &'static str {
        match self {
            ReplyMode::Casual => {
                "Reply like a text message: one to three short sentences, conversational, \
                 with little or no narration."
            }
            ReplyMode::Roleplay => {
                "Write in roleplay format: actions in *asterisks*, spoken words in \"double quotes\", \
                 inner thoughts in (parentheses). Keep replies to a few paragraphs."
            }
            ReplyMode::Story => {
                "Write immersive third-person prose with vivid narration. Put spoken words in \
                 \"double quotes\". Replies may run several paragraphs."
            }
        }
    }
}

/// Represents a chunk of streamed content from the model.
#[derive(Debug, PartialEq)]
pub enum StreamChunk {
    Content(String),
    Thinking(String),
    /// The provider reported the end of the response.
    Completed,
}
