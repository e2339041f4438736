//! The user's side of a turn.

use serde::{Deserialize, Serialize};

/// Who the requester is buying as. Drives domain-list selection and prompt
/// framing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserType {
    /// Individual consumer
    #[default]
    B2C,
    /// Business buyer looking for suppliers
    B2B,
}

impl UserType {
    /// Parse a model-provided label. Anything unrecognised is `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "B2C" | "CONSUMER" => Some(Self::B2C),
            "B2B" | "BUSINESS" => Some(Self::B2B),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::B2C => "B2C",
            Self::B2B => "B2B",
        }
    }

    /// Human-readable framing used inside prompts.
    pub fn description(&self) -> &'static str {
        match self {
            Self::B2C => "an individual consumer buying for personal use",
            Self::B2B => "a business buyer sourcing from suppliers, possibly in bulk",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One classified user request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRequest {
    /// What the user typed this turn.
    pub text: String,

    /// The previous turn's text, when the caller supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_turn: Option<String>,

    pub user_type: UserType,

    /// Whether this turn refines the previous one.
    #[serde(default)]
    pub is_follow_up: bool,
}

impl UserRequest {
    /// An unclassified request with the documented defaults.
    pub fn new(text: impl Into<String>, prior_turn: Option<String>) -> Self {
        Self {
            text: text.into(),
            prior_turn,
            user_type: UserType::default(),
            is_follow_up: false,
        }
    }

    /// Prior-turn text, but only when this turn is a follow-up.
    pub fn follow_up_context(&self) -> Option<&str> {
        if self.is_follow_up {
            self.prior_turn.as_deref()
        } else {
            None
        }
    }
}
