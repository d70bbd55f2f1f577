use serde::{Deserialize, Serialize};

/// Lifecycle state of an uploaded file.
///
/// Stored and serialized as the upstream string form (`"ACTIVE"`, ...).
/// States this build does not know about round-trip through [`FileState::Other`]
/// rather than failing the read; only [`FileState::Active`] files are eligible
/// for use by the orchestration loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileState {
    /// Uploaded and ready for use.
    Active,
    /// Still being processed by the upload service.
    Processing,
    /// The upload service rejected or lost the file.
    Failed,
    /// Any other lifecycle state reported by the upload service.
    Other(String),
}

impl FileState {
    /// The storage representation of this state.
    pub fn as_str(&self) -> &str {
        match self {
            FileState::Active => "ACTIVE",
            FileState::Processing => "PROCESSING",
            FileState::Failed => "FAILED",
            FileState::Other(raw) => raw,
        }
    }

    /// Whether this file is usable by the orchestration loop.
    pub fn is_active(&self) -> bool {
        *self == FileState::Active
    }
}

impl From<String> for FileState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "ACTIVE" => FileState::Active,
            "PROCESSING" => FileState::Processing,
            "FAILED" => FileState::Failed,
            _ => FileState::Other(raw),
        }
    }
}

impl From<FileState> for String {
    fn from(state: FileState) -> Self {
        state.as_str().to_string()
    }
}

/// Metadata for one uploaded file.
///
/// Maps 1:1 to the `files` relation; `file_uri` is the unique identifier.
/// The store's upsert only ever rewrites `state` and `expires_at` of an
/// existing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Unique, URI-like file identifier.
    pub file_uri: String,
    /// MIME type of the file contents.
    pub mime_type: String,
    /// Display name.
    pub name: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// Upload timestamp, epoch milliseconds.
    pub uploaded_at: i64,
    /// Current lifecycle state.
    pub state: FileState,
    /// Expiry timestamp, epoch milliseconds. Files with no expiry are
    /// never swept.
    #[serde(default)]
    pub expires_at: Option<i64>,
}
