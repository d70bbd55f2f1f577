use crate::file::FileMetadata;
use crate::message::now_millis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Accumulated references from earlier turns of the conversation.
///
/// The records are produced by collaborators outside this store (search,
/// code execution, image handling); they are persisted wholesale and not
/// interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    /// Identifiers of files referenced so far.
    #[serde(default)]
    pub referenced_files: Vec<String>,
    /// Search results surfaced to the model.
    #[serde(default)]
    pub search_results: Vec<serde_json::Value>,
    /// Code-execution records.
    #[serde(default)]
    pub code_executions: Vec<serde_json::Value>,
    /// Images attached to the conversation.
    #[serde(default)]
    pub images: Vec<serde_json::Value>,
}

/// Long-lived memory carried across turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBlock {
    /// User preference key-value pairs.
    #[serde(default)]
    pub user_preferences: HashMap<String, String>,
    /// Recently discussed topics, newest last.
    #[serde(default)]
    pub recent_topics: Vec<String>,
    /// Interaction patterns that worked well.
    #[serde(default)]
    pub successful_patterns: Vec<String>,
}

/// The whole-session state blob, persisted under the single `state` key.
///
/// Overwritten wholesale on every save; never partially updated. The
/// `uploaded_files` list is a denormalized snapshot — the file registry's
/// rows are authoritative, and callers own any reconciliation between the
/// two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Accumulated conversation context.
    #[serde(default)]
    pub context: ConversationContext,
    /// Opaque session identifier, stable for the session's lifetime.
    pub session_id: String,
    /// Last-activity timestamp, epoch milliseconds.
    pub last_activity: i64,
    /// The agent's current plan, if one is in flight. Opaque to the store.
    #[serde(default)]
    pub current_plan: Option<serde_json::Value>,
    /// Snapshot of uploaded-file references. Back-filled to empty when
    /// absent from an earlier persisted version.
    #[serde(default)]
    pub uploaded_files: Vec<FileMetadata>,
    /// Session memory. Back-filled to an empty block when absent from an
    /// earlier persisted version.
    #[serde(default)]
    pub memory: MemoryBlock,
}

impl SessionState {
    /// Creates a fresh default state with a newly generated session
    /// identifier and the current time as last activity.
    pub fn new() -> Self {
        Self {
            context: ConversationContext::default(),
            session_id: Uuid::new_v4().to_string(),
            last_activity: now_millis(),
            current_plan: None,
            uploaded_files: Vec::new(),
            memory: MemoryBlock::default(),
        }
    }

    /// Stamps `last_activity` with the current time.
    pub fn touch(&mut self) {
        self.last_activity = now_millis();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_fresh_identity() {
        let a = SessionState::new();
        let b = SessionState::new();
        assert!(!a.session_id.is_empty());
        assert_ne!(a.session_id, b.session_id);
        assert!(a.last_activity > 0);
        assert!(a.uploaded_files.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_all_fields() {
        let mut state = SessionState::new();
        state.context.referenced_files.push("files/abc".to_string());
        state
            .context
            .search_results
            .push(serde_json::json!({"query": "rust", "hits": 3}));
        state.current_plan = Some(serde_json::json!({"steps": ["a", "b"]}));
        state
            .memory
            .user_preferences
            .insert("tone".to_string(), "terse".to_string());
        state.memory.recent_topics.push("sqlite".to_string());

        let json = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_older_blob_without_optional_collections_back_fills() {
        // Persisted by a version that predates uploadedFiles and memory.
        let json = serde_json::json!({
            "context": {"referencedFiles": ["files/abc"]},
            "sessionId": "session-1",
            "lastActivity": 1_700_000_000_000_i64,
        });
        let state: SessionState = serde_json::from_value(json).unwrap();
        assert_eq!(state.session_id, "session-1");
        assert!(state.uploaded_files.is_empty());
        assert_eq!(state.memory, MemoryBlock::default());
        assert_eq!(state.current_plan, None);
        assert_eq!(state.context.referenced_files, vec!["files/abc"]);
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let state = SessionState::new();
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("sessionId").is_some());
        assert!(json.get("lastActivity").is_some());
        assert!(json.get("uploadedFiles").is_some());
        assert!(json.get("session_id").is_none());
    }
}
