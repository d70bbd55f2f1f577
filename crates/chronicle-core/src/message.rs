use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The role of the participant that authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The language model.
    Model,
}

impl Role {
    /// The storage representation of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }

    /// Parses a stored role string.
    ///
    /// Anything that is not the literal `"user"` reads as [`Role::Model`],
    /// so histories written by older producers (e.g. `"assistant"`) still
    /// surface as model turns.
    pub fn parse(raw: &str) -> Self {
        if raw == "user" {
            Role::User
        } else {
            Role::Model
        }
    }
}

/// A reference to a previously uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// The unique, URI-like identifier of the uploaded file.
    pub file_uri: String,
    /// MIME type of the referenced file.
    pub mime_type: String,
}

/// An inline binary payload, carried base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// MIME type of the payload.
    pub mime_type: String,
    /// Base64-encoded bytes. Opaque to the store.
    pub data: String,
}

/// One structured payload unit within a message turn.
///
/// Serialized untagged, so each part persists as a plain JSON object:
/// `{"text": ...}`, `{"fileData": {...}}` or `{"inlineData": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// A plain text segment.
    Text {
        /// The text content.
        text: String,
    },
    /// A reference to an uploaded file.
    FileData {
        /// The file reference.
        #[serde(rename = "fileData")]
        file_data: FileRef,
    },
    /// Inline binary data.
    InlineData {
        /// The inline payload.
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

impl Part {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Creates a file-reference part.
    pub fn file(file_uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Part::FileData {
            file_data: FileRef {
                file_uri: file_uri.into(),
                mime_type: mime_type.into(),
            },
        }
    }

    /// Returns the text carried by this part, if any.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A single turn in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the turn's author.
    pub role: Role,
    /// Ordered payload parts. A turn with zero parts is never surfaced
    /// by the store's readers.
    pub parts: Vec<Part>,
    /// Insertion timestamp, epoch milliseconds. Non-decreasing across
    /// the log but not necessarily unique.
    pub timestamp: i64,
}

impl Message {
    /// Creates a message stamped with the current time.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role,
            parts,
            timestamp: now_millis(),
        }
    }

    /// Creates a user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Creates a model message with a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
