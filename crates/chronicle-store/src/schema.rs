use chronicle_core::{ChronicleError, ChronicleResult};
use rusqlite::Connection;

/// Idempotently creates the three persisted relations and their indexes.
///
/// Safe to invoke on every process start; a bootstrap failure is fatal to
/// the store and propagates to the caller.
pub fn initialize(conn: &Connection) -> ChronicleResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            role TEXT NOT NULL,
            parts TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_timestamp
            ON messages(timestamp);

        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_uri TEXT NOT NULL UNIQUE,
            mime_type TEXT NOT NULL,
            name TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            uploaded_at INTEGER NOT NULL,
            state TEXT NOT NULL,
            expires_at INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_files_state
            ON files(state);

        CREATE INDEX IF NOT EXISTS idx_files_uploaded_at
            ON files(uploaded_at);

        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| ChronicleError::Store(format!("Failed to create tables: {e}")))
}
