//! Domain events emitted by the ledger engines
//!
//! Wire envelope handed to whatever transport fans events out:
//!
//!   { "event": "project_revived", "data": { "project_id": "...", "reviver_id": "...", "owner_id": "..." } }
//!   { "event": "note_added", "data": { "project_id": "...", "note_id": "...", "visible_author": { "kind": "anonymous" } } }
//!   { "event": "leaderboard_changed", "data": {} }

use serde::{Deserialize, Serialize};

use crate::types::{NoteAuthor, NoteId, ProjectId, UserId};

/// Events the core publishes to the notifier. Delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LedgerEvent {
    ProjectRevived {
        project_id: ProjectId,
        reviver_id: UserId,
        owner_id: UserId,
    },
    NoteAdded {
        project_id: ProjectId,
        note_id: NoteId,
        visible_author: NoteAuthor,
    },
    LeaderboardChanged {},
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::ProjectRevived { .. } => "project_revived",
            LedgerEvent::NoteAdded { .. } => "note_added",
            LedgerEvent::LeaderboardChanged {} => "leaderboard_changed",
        }
    }

    /// Project the event concerns, if any.
    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            LedgerEvent::ProjectRevived { project_id, .. }
            | LedgerEvent::NoteAdded { project_id, .. } => Some(project_id),
            LedgerEvent::LeaderboardChanged {} => None,
        }
    }
}

/// Server-pushed event envelope (no request correlation).
#[derive(Debug, Clone, Serialize)]
pub struct EventMessage {
    pub event: String,
    pub data: serde_json::Value,
}

impl EventMessage {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&LedgerEvent> for EventMessage {
    fn from(event: &LedgerEvent) -> Self {
        let data = match serde_json::to_value(event) {
            Ok(serde_json::Value::Object(mut map)) => map
                .remove("data")
                .unwrap_or_else(|| serde_json::json!({})),
            _ => serde_json::json!({}),
        };
        Self::new(event.kind(), data)
    }
}
