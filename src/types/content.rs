use serde::{Deserialize, Serialize};

/// The author of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Turn written by the person at the keyboard.
    User,
    /// Turn produced by the model.
    Model,
}

/// A single turn of content: a role and an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// The producer of the content.  The API omits this on some responses.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<Role>,

    /// The parts making up this turn.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Creates a user turn holding a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::User),
            parts: vec![Part::text(text)],
        }
    }

    /// Creates a model turn holding a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::Model),
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenates the text parts of this turn, skipping every other kind of part.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let Some(text) = part.as_text() {
                out.push_str(text);
            }
        }
        out
    }
}

/// One part of a turn.
///
/// Only text is interpreted by gemi.  Every other shape the API may return
/// (inline data, function calls, executable code, ...) is kept verbatim as
/// [`Part::Other`] so it survives a round trip through the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// A text part.
    Text(TextPart),
    /// Any part that is not text.
    Other(serde_json::Value),
}

impl Part {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(TextPart { text: text.into() })
    }

    /// Returns the text of this part if it is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(part) => Some(&part.text),
            Part::Other(_) => None,
        }
    }
}

/// A part consisting of plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPart {
    /// The text.
    pub text: String,
}
