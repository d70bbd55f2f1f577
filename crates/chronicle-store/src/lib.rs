//! SQLite-backed session persistence for Chronicle agents.
//!
//! This crate is the durable backing store an agent orchestration loop reads
//! from and writes to between model invocations. One [`SqliteSessionStore`]
//! owns one session's database and implements three seams:
//!
//! - [`StateStore`] — load/save of the whole-session [`SessionState`] blob,
//!   with defaulting on read.
//! - [`MessageLog`] — the append-only, timestamp-ordered message log.
//! - [`FileRegistry`] — upsertable uploaded-file metadata with expiry
//!   sweeping.
//!
//! [`HistoryBuilder`] sits on top of any [`MessageLog`] and derives the
//! model-ready conversation window.
//!
//! Each session has a single logical owner, so the store performs no
//! in-process coordination beyond serializing access to its connection; all
//! operations are synchronous with respect to SQLite.
//!
//! [`SessionState`]: chronicle_core::SessionState

/// Store configuration.
pub mod config;
/// Model-ready history windows.
pub mod history;
/// Schema bootstrap.
pub mod schema;
/// The store traits and their SQLite implementation.
pub mod store;

pub use config::StoreConfig;
pub use history::{HistoryBuilder, ModelTurn};
pub use store::{
    DefaultCause, FileRegistry, MessageLog, SqliteSessionStore, StateLoad, StateStore,
};
