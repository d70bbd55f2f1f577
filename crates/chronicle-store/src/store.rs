use crate::config::StoreConfig;
use crate::schema;
use chronicle_core::{
    ChronicleError, ChronicleResult, FileMetadata, FileState, Message, Part, Role, SessionState,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// The kv key under which the whole-session state blob is stored.
const STATE_KEY: &str = "state";

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// Load/save of the whole-session state blob.
pub trait StateStore {
    /// Loads the persisted session state, falling back to a fresh default
    /// when no valid state exists. Never fails; the returned [`StateLoad`]
    /// reports whether (and why) a default was produced.
    fn load_state(&self) -> StateLoad;

    /// Serializes the entire state and upserts it under the single state
    /// key. A failed save must be visible to the caller.
    fn save_state(&self, state: &SessionState) -> ChronicleResult<()>;
}

/// The append-only, timestamp-ordered log of conversation turns.
pub trait MessageLog {
    /// Inserts one turn.
    fn append(&self, role: Role, parts: &[Part], timestamp: i64) -> ChronicleResult<()>;

    /// Returns messages in chronological order. With a limit, the window
    /// covers the most recent `n` rows, still chronological. Rows whose
    /// parts deserialize to an empty sequence are excluded. Read failures
    /// return an empty vec.
    fn history(&self, limit: Option<usize>) -> Vec<Message>;

    /// The text of the most recent user turn's first text-bearing part,
    /// or an empty string.
    fn last_user_text(&self) -> String;

    /// Total number of logged turns; 0 on read failure.
    fn count(&self) -> usize;

    /// Deletes all messages, files, and kv rows and resets the message and
    /// file auto-increment counters. A caller that asked to reset session
    /// memory must know if it did not happen, so failures propagate.
    fn clear(&self) -> ChronicleResult<()>;
}

/// Upsertable uploaded-file metadata with lifecycle and expiry tracking.
pub trait FileRegistry {
    /// Inserts the file, or — when `file_uri` already exists — updates only
    /// `state` and `expires_at` of the existing row.
    fn upsert(&self, file: &FileMetadata) -> ChronicleResult<()>;

    /// Updates the lifecycle state of one file. Missing identifiers are a
    /// silent no-op; failures are logged, not raised.
    fn update_state(&self, file_uri: &str, state: FileState);

    /// All files, most recently uploaded first; empty on read failure.
    fn list(&self) -> Vec<FileMetadata>;

    /// [`list`](FileRegistry::list) filtered to `ACTIVE` files.
    fn list_active(&self) -> Vec<FileMetadata>;

    /// Removes the row for `file_uri`; no-op when absent, failures logged.
    fn delete(&self, file_uri: &str);

    /// Number of `ACTIVE` files; 0 on read failure.
    fn active_count(&self) -> usize;

    /// Deletes every file whose expiry is set and strictly before `now`.
    /// Returns the number of rows removed; 0 on failure. Files without an
    /// expiry are never swept.
    fn sweep_expired(&self, now: i64) -> usize;
}

// ---------------------------------------------------------------------------
// StateLoad
// ---------------------------------------------------------------------------

/// Why a [`StateLoad`] fell back to a default state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultCause {
    /// No state key has been persisted yet.
    Missing,
    /// The persisted payload did not deserialize into a structurally valid
    /// state (bad JSON or an empty session identifier).
    Malformed,
    /// The storage engine failed while reading.
    ReadFailed,
}

/// Outcome of [`StateStore::load_state`].
///
/// A load never fails outright; callers that only want a state can collapse
/// the outcome with [`into_state`](StateLoad::into_state), while the
/// orchestration loop may inspect the cause of a defaulted load instead of
/// relying on log output.
#[derive(Debug, Clone)]
pub enum StateLoad {
    /// Persisted state was present and structurally valid.
    Loaded(SessionState),
    /// No usable state existed; a fresh default was produced.
    Defaulted {
        /// The freshly created default state.
        state: SessionState,
        /// Why the fallback happened.
        cause: DefaultCause,
    },
}

impl StateLoad {
    /// Collapses the outcome into the carried state.
    pub fn into_state(self) -> SessionState {
        match self {
            StateLoad::Loaded(state) | StateLoad::Defaulted { state, .. } => state,
        }
    }

    /// The carried state, loaded or defaulted.
    pub fn state(&self) -> &SessionState {
        match self {
            StateLoad::Loaded(state) | StateLoad::Defaulted { state, .. } => state,
        }
    }

    /// Whether a fresh default was produced instead of a persisted state.
    pub fn was_defaulted(&self) -> bool {
        matches!(self, StateLoad::Defaulted { .. })
    }
}

// ---------------------------------------------------------------------------
// SqliteSessionStore
// ---------------------------------------------------------------------------

/// SQLite-backed store for one session's durable state.
///
/// Each session has a single logical owner, so the connection is only
/// mutex-wrapped to satisfy `Send + Sync`; there is no multi-writer
/// coordination beyond that.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Opens (or creates) the session database at `path` and bootstraps the
    /// schema. Parent directories are created as needed.
    pub fn open(path: impl AsRef<Path>) -> ChronicleResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| ChronicleError::Store(format!("Failed to open session DB: {e}")))?;
        debug!("Opened session store at {}", path.display());
        Self::bootstrap(conn)
    }

    /// Opens an in-memory store, for tests and ephemeral sessions.
    pub fn open_in_memory() -> ChronicleResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChronicleError::Store(format!("Failed to open in-memory DB: {e}")))?;
        Self::bootstrap(conn)
    }

    /// Opens the store described by `config`.
    pub fn open_with(config: &StoreConfig) -> ChronicleResult<Self> {
        Self::open(&config.database_path)
    }

    fn bootstrap(conn: Connection) -> ChronicleResult<Self> {
        // WAL keeps concurrent readers (e.g. an inspection tool) cheap; both
        // pragmas are advisory and in-memory databases ignore the first.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .ok();
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> ChronicleResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ChronicleError::Store(format!("Connection lock poisoned: {e}")))
    }

    fn try_history(&self, limit: Option<usize>) -> ChronicleResult<Vec<Message>> {
        let conn = self.lock()?;
        // With a bound, fetch newest-first so LIMIT selects the tail, then
        // restore chronological order.
        let sql = match limit {
            Some(_) => {
                "SELECT role, parts, timestamp FROM messages
                 ORDER BY timestamp DESC, id DESC LIMIT ?1"
            }
            None => {
                "SELECT role, parts, timestamp FROM messages
                 ORDER BY timestamp ASC, id ASC"
            }
        };
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| ChronicleError::Store(format!("Prepare error: {e}")))?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        };
        let rows = match limit {
            Some(n) => stmt.query_map(params![n as i64], map_row),
            None => stmt.query_map([], map_row),
        }
        .map_err(|e| ChronicleError::Store(format!("Query error: {e}")))?;

        let mut fetched: Vec<(String, String, i64)> = Vec::new();
        for row in rows {
            fetched.push(row.map_err(|e| ChronicleError::Store(format!("Row error: {e}")))?);
        }
        if limit.is_some() {
            fetched.reverse();
        }

        let messages = fetched
            .into_iter()
            .filter_map(|(role, raw_parts, timestamp)| {
                let parts = parse_parts(&raw_parts);
                if parts.is_empty() {
                    return None;
                }
                Some(Message {
                    role: Role::parse(&role),
                    parts,
                    timestamp,
                })
            })
            .collect();
        Ok(messages)
    }

    fn try_last_user_text(&self) -> ChronicleResult<String> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT parts FROM messages WHERE role = 'user'
                 ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ChronicleError::Store(format!("Query error: {e}")))?;

        let Some(raw) = raw else {
            return Ok(String::new());
        };
        let text = parse_parts(&raw)
            .iter()
            .find_map(|part| part.text_content().map(ToString::to_string))
            .unwrap_or_default();
        Ok(text)
    }

    fn try_count(&self) -> ChronicleResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .map_err(|e| ChronicleError::Store(format!("Count error: {e}")))?;
        Ok(count as usize)
    }

    fn try_list_files(&self, active_only: bool) -> ChronicleResult<Vec<FileMetadata>> {
        let conn = self.lock()?;
        let sql = if active_only {
            "SELECT file_uri, mime_type, name, size_bytes, uploaded_at, state, expires_at
             FROM files WHERE state = ?1 ORDER BY uploaded_at DESC, id DESC"
        } else {
            "SELECT file_uri, mime_type, name, size_bytes, uploaded_at, state, expires_at
             FROM files ORDER BY uploaded_at DESC, id DESC"
        };
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| ChronicleError::Store(format!("Prepare error: {e}")))?;
        let rows = if active_only {
            stmt.query_map(params![FileState::Active.as_str()], file_from_row)
        } else {
            stmt.query_map([], file_from_row)
        }
        .map_err(|e| ChronicleError::Store(format!("Query error: {e}")))?;

        let mut files = Vec::new();
        for row in rows {
            files.push(row.map_err(|e| ChronicleError::Store(format!("Row error: {e}")))?);
        }
        Ok(files)
    }

    fn try_active_count(&self) -> ChronicleResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM files WHERE state = ?1",
                params![FileState::Active.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| ChronicleError::Store(format!("Count error: {e}")))?;
        Ok(count as usize)
    }

    fn try_sweep_expired(&self, now: i64) -> ChronicleResult<usize> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM files WHERE expires_at IS NOT NULL AND expires_at < ?1",
                params![now],
            )
            .map_err(|e| ChronicleError::Store(format!("Sweep error: {e}")))?;
        Ok(removed)
    }
}

impl StateStore for SqliteSessionStore {
    fn load_state(&self) -> StateLoad {
        let defaulted = |cause: DefaultCause| StateLoad::Defaulted {
            state: SessionState::new(),
            cause,
        };

        let conn = match self.lock() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to read session state, using defaults: {e}");
                return defaulted(DefaultCause::ReadFailed);
            }
        };
        let raw = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![STATE_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional();
        drop(conn);

        match raw {
            Ok(Some(raw)) => match serde_json::from_str::<SessionState>(&raw) {
                Ok(state) if !state.session_id.is_empty() => StateLoad::Loaded(state),
                Ok(_) => {
                    warn!("Persisted session state has an empty session id, using defaults");
                    defaulted(DefaultCause::Malformed)
                }
                Err(e) => {
                    warn!("Persisted session state is malformed, using defaults: {e}");
                    defaulted(DefaultCause::Malformed)
                }
            },
            Ok(None) => {
                debug!("No persisted session state, starting fresh");
                defaulted(DefaultCause::Missing)
            }
            Err(e) => {
                warn!("Failed to read session state, using defaults: {e}");
                defaulted(DefaultCause::ReadFailed)
            }
        }
    }

    fn save_state(&self, state: &SessionState) -> ChronicleResult<()> {
        let json = serde_json::to_string(state)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![STATE_KEY, json],
        )
        .map_err(|e| ChronicleError::State(format!("Failed to save session state: {e}")))?;
        Ok(())
    }
}

impl MessageLog for SqliteSessionStore {
    fn append(&self, role: Role, parts: &[Part], timestamp: i64) -> ChronicleResult<()> {
        let raw_parts = serde_json::to_string(parts)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages (role, parts, timestamp) VALUES (?1, ?2, ?3)",
            params![role.as_str(), raw_parts, timestamp],
        )
        .map_err(|e| ChronicleError::Store(format!("Insert message error: {e}")))?;
        Ok(())
    }

    fn history(&self, limit: Option<usize>) -> Vec<Message> {
        match self.try_history(limit) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Failed to read message history: {e}");
                Vec::new()
            }
        }
    }

    fn last_user_text(&self) -> String {
        match self.try_last_user_text() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read last user message: {e}");
                String::new()
            }
        }
    }

    fn count(&self) -> usize {
        match self.try_count() {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count messages: {e}");
                0
            }
        }
    }

    fn clear(&self) -> ChronicleResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| ChronicleError::Store(format!("Clear begin error: {e}")))?;
        for table in ["messages", "files", "kv"] {
            tx.execute(&format!("DELETE FROM {table}"), [])
                .map_err(|e| ChronicleError::Store(format!("Clear {table} error: {e}")))?;
        }
        // sqlite_sequence only exists once an AUTOINCREMENT insert happened.
        let has_sequence: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name = 'sqlite_sequence'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| ChronicleError::Store(format!("Clear sequence check error: {e}")))?;
        if has_sequence > 0 {
            tx.execute(
                "DELETE FROM sqlite_sequence WHERE name IN ('messages', 'files')",
                [],
            )
            .map_err(|e| ChronicleError::Store(format!("Clear sequence reset error: {e}")))?;
        }
        tx.commit()
            .map_err(|e| ChronicleError::Store(format!("Clear commit error: {e}")))
    }
}

impl FileRegistry for SqliteSessionStore {
    fn upsert(&self, file: &FileMetadata) -> ChronicleResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO files (file_uri, mime_type, name, size_bytes, uploaded_at, state, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(file_uri) DO UPDATE SET
                 state = excluded.state,
                 expires_at = excluded.expires_at",
            params![
                file.file_uri,
                file.mime_type,
                file.name,
                file.size_bytes,
                file.uploaded_at,
                file.state.as_str(),
                file.expires_at,
            ],
        )
        .map_err(|e| ChronicleError::Store(format!("Upsert file error: {e}")))?;
        Ok(())
    }

    fn update_state(&self, file_uri: &str, state: FileState) {
        let result = self.lock().and_then(|conn| {
            conn.execute(
                "UPDATE files SET state = ?1 WHERE file_uri = ?2",
                params![state.as_str(), file_uri],
            )
            .map_err(|e| ChronicleError::Store(format!("Update file state error: {e}")))
        });
        if let Err(e) = result {
            warn!("Failed to update state of {file_uri}: {e}");
        }
    }

    fn list(&self) -> Vec<FileMetadata> {
        match self.try_list_files(false) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list files: {e}");
                Vec::new()
            }
        }
    }

    fn list_active(&self) -> Vec<FileMetadata> {
        match self.try_list_files(true) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list active files: {e}");
                Vec::new()
            }
        }
    }

    fn delete(&self, file_uri: &str) {
        let result = self.lock().and_then(|conn| {
            conn.execute("DELETE FROM files WHERE file_uri = ?1", params![file_uri])
                .map_err(|e| ChronicleError::Store(format!("Delete file error: {e}")))
        });
        if let Err(e) = result {
            warn!("Failed to delete {file_uri}: {e}");
        }
    }

    fn active_count(&self) -> usize {
        match self.try_active_count() {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count active files: {e}");
                0
            }
        }
    }

    fn sweep_expired(&self, now: i64) -> usize {
        match self.try_sweep_expired(now) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to sweep expired files: {e}");
                0
            }
        }
    }
}

fn file_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileMetadata> {
    Ok(FileMetadata {
        file_uri: row.get(0)?,
        mime_type: row.get(1)?,
        name: row.get(2)?,
        size_bytes: row.get(3)?,
        uploaded_at: row.get(4)?,
        state: FileState::from(row.get::<_, String>(5)?),
        expires_at: row.get(6)?,
    })
}

/// Deserializes a stored parts column. Unreadable payloads degrade to an
/// empty sequence, which readers then exclude.
fn parse_parts(raw: &str) -> Vec<Part> {
    match serde_json::from_str::<Vec<Part>>(raw) {
        Ok(parts) => parts,
        Err(e) => {
            warn!("Dropping message with unreadable parts: {e}");
            Vec::new()
        }
    }
}
