use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for opening a [`SqliteSessionStore`].
///
/// [`SqliteSessionStore`]: crate::SqliteSessionStore
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Location of the session database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Default number of recent messages handed to the model.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("chronicle.db")
}

fn default_history_window() -> usize {
    50
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            history_window: default_history_window(),
        }
    }
}
