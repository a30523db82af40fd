use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::places::LocationEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a chat session. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    /// Places extracted from `text`, in block order. Always empty for user turns.
    pub locations: Vec<LocationEntry>,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            locations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>, locations: Vec<LocationEntry>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            locations,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn has_locations(&self) -> bool {
        !self.locations.is_empty()
    }
}
