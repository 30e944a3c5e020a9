//! Profile and turn records as they live in the store document

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One persisted message. Sequence position, not the timestamp, orders turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: NaiveDateTime,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now().naive_local(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A turn without its timestamp, as fed back into completion requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Per-user settings plus conversation history
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub model: String,
    pub web_search_enabled: bool,
    pub history: Vec<Turn>,
}

impl UserProfile {
    /// Profile materialized on first access
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            web_search_enabled: true,
            history: Vec::new(),
        }
    }

    /// The last `limit` turns in chronological order
    pub fn recent_history(&self, limit: usize) -> Vec<HistoryEntry> {
        let skip = self.history.len().saturating_sub(limit);
        self.history[skip..]
            .iter()
            .map(|turn| HistoryEntry {
                role: turn.role,
                content: turn.content.clone(),
            })
            .collect()
    }
}

/// On-disk record. Every field is optional so that records written by older
/// or interrupted writers still load; `heal` fills the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoredProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Turn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search: Option<bool>,
}

impl StoredProfile {
    /// True when no field needs backfilling
    pub fn is_complete(&self) -> bool {
        self.model.is_some() && self.history.is_some() && self.web_search.is_some()
    }

    /// Convert to a full profile, backfilling missing fields with defaults
    pub fn heal(self, default_model: &str) -> UserProfile {
        UserProfile {
            model: self.model.unwrap_or_else(|| default_model.to_string()),
            web_search_enabled: self.web_search.unwrap_or(true),
            history: self.history.unwrap_or_default(),
        }
    }
}

impl From<UserProfile> for StoredProfile {
    fn from(profile: UserProfile) -> Self {
        Self {
            model: Some(profile.model),
            history: Some(profile.history),
            web_search: Some(profile.web_search_enabled),
        }
    }
}
