//! Domain types for the todo store.
//!
//! # Design
//! Request payloads keep every field as `Option` so "missing" is visible to
//! the store's validation instead of being rejected by the JSON decoder.
//! `TodoPatch` is presence-based: `Some(false)` for `completed` is a real
//! change, only `None` means "leave as is".

use serde::{Deserialize, Serialize};

/// Store-assigned identifier. Starts at 1 and is never reused.
pub type TodoId = u64;

/// A single todo record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

/// Payload for creating a todo. Unknown keys such as `completed` are ignored;
/// new records always start out incomplete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
        }
    }
}

/// Partial update for an existing todo. Only the fields present are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// True when the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    /// Write every present field onto `todo`.
    pub(crate) fn apply_to(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = description;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}
