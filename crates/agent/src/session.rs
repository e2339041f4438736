//! In-memory turn history.
//!
//! Every submitted request is recorded before its pipeline runs, so the
//! user's text survives a failed turn. Nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Pending,
    Completed { search_query: String, products: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
    pub outcome: TurnOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct TurnHistory {
    turns: Vec<Turn>,
}

impl TurnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new request and return its id.
    pub fn submit(&mut self, text: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.turns.push(Turn {
            id,
            text: text.into(),
            submitted_at: Utc::now(),
            outcome: TurnOutcome::Pending,
        });
        id
    }

    /// Text of the turn submitted before `id`, used as follow-up context.
    pub fn prior_text(&self, id: Uuid) -> Option<&str> {
        let pos = self.turns.iter().position(|t| t.id == id)?;
        pos.checked_sub(1).map(|p| self.turns[p].text.as_str())
    }

    /// Text of the most recent turn.
    pub fn last_text(&self) -> Option<&str> {
        self.turns.last().map(|t| t.text.as_str())
    }

    pub fn complete(&mut self, id: Uuid, search_query: impl Into<String>, products: usize) {
        self.set_outcome(
            id,
            TurnOutcome::Completed {
                search_query: search_query.into(),
                products,
            },
        );
    }

    pub fn fail(&mut self, id: Uuid, error: impl std::fmt::Display) {
        self.set_outcome(
            id,
            TurnOutcome::Failed {
                error: error.to_string(),
            },
        );
    }

    fn set_outcome(&mut self, id: Uuid, outcome: TurnOutcome) {
        if let Some(turn) = self.turns.iter_mut().find(|t| t.id == id) {
            turn.outcome = outcome;
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
