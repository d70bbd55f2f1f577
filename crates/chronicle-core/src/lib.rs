//! Core types for the Chronicle session store.
//!
//! This crate provides the foundational types shared across the Chronicle
//! workspace: error handling, message and part representations, the
//! whole-session state blob, and uploaded-file metadata.
//!
//! # Main types
//!
//! - [`ChronicleError`] — Unified error enum for all Chronicle subsystems.
//! - [`ChronicleResult`] — Convenience alias for `Result<T, ChronicleError>`.
//! - [`Role`] — Message role (user or model).
//! - [`Part`] — One structured payload unit within a message turn.
//! - [`Message`] — A single turn in the conversation log.
//! - [`SessionState`] — The whole-session state persisted between turns.
//! - [`FileMetadata`] — Metadata for one uploaded file.

/// Error types shared across the workspace.
pub mod error;
/// Uploaded-file metadata and lifecycle states.
pub mod file;
/// Message turns and their typed parts.
pub mod message;
/// The whole-session state blob.
pub mod state;

pub use error::{ChronicleError, ChronicleResult};
pub use file::{FileMetadata, FileState};
pub use message::{now_millis, Blob, FileRef, Message, Part, Role};
pub use state::{ConversationContext, MemoryBlock, SessionState};
