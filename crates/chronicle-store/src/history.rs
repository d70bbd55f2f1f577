use crate::store::MessageLog;
use chronicle_core::{Part, Role};
use serde::Serialize;

/// One entry of the model-ready conversation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelTurn {
    /// Normalized author role, exactly `user` or `model`.
    pub role: Role,
    /// The turn's payload parts.
    pub parts: Vec<Part>,
}

/// Derives model-ready conversation windows from a [`MessageLog`].
pub struct HistoryBuilder<'a, L: MessageLog + ?Sized> {
    log: &'a L,
}

impl<'a, L: MessageLog + ?Sized> HistoryBuilder<'a, L> {
    /// Creates a builder over `log`.
    pub fn new(log: &'a L) -> Self {
        Self { log }
    }

    /// Returns the most recent `max_messages` turns in chronological order.
    ///
    /// A trailing user turn is dropped: the caller is about to supply that
    /// pending turn as the new prompt, and the history must not present it
    /// a second time.
    pub fn model_history(&self, max_messages: usize) -> Vec<ModelTurn> {
        let mut turns: Vec<ModelTurn> = self
            .log
            .history(Some(max_messages))
            .into_iter()
            .map(|message| ModelTurn {
                role: message.role,
                parts: message.parts,
            })
            .collect();
        if turns.last().is_some_and(|turn| turn.role == Role::User) {
            turns.pop();
        }
        turns
    }
}
