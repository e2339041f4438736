//! Pipeline progress events.
//!
//! `PipelineEvent` is the only intermediate state the pipeline exposes.
//! Callers receive it over an mpsc channel and may render it however they
//! like.

use serde::{Deserialize, Serialize};

/// The macro stages of one turn, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classify,
    Rewrite,
    Research,
    Recommend,
    Conclude,
    Deliver,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Self::Classify,
        Self::Rewrite,
        Self::Research,
        Self::Recommend,
        Self::Conclude,
        Self::Deliver,
    ];

    /// 1-based position.
    pub fn index(&self) -> usize {
        match self {
            Self::Classify => 1,
            Self::Rewrite => 2,
            Self::Research => 3,
            Self::Recommend => 4,
            Self::Conclude => 5,
            Self::Deliver => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Classify => "Understanding your request",
            Self::Rewrite => "Writing the search query",
            Self::Research => "Searching forums and marketplaces",
            Self::Recommend => "Ranking products",
            Self::Conclude => "Writing the summary",
            Self::Deliver => "Done",
        }
    }
}

/// Events emitted while a turn runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A stage has started.
    Stage { stage: Stage, index: usize },

    /// A step failed and was recovered locally.
    Degraded { stage: Stage, step: String, reason: String },

    /// The turn finished with a result.
    Done { stage_reached: Stage },

    /// The turn failed.
    Failed { stage: Stage, message: String },
}

impl PipelineEvent {
    pub fn stage(stage: Stage) -> Self {
        Self::Stage {
            stage,
            index: stage.index(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Stage { .. } => "stage",
            Self::Degraded { .. } => "degraded",
            Self::Done { .. } => "done",
            Self::Failed { .. } => "failed",
        }
    }
}
