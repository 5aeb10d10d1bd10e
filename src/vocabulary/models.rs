//! Data models for saved vocabulary

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a saved entry
pub type EntryId = Uuid;

/// Opaque identifier of a learner, one per conversation identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for OwnerId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A word and its definition as saved by one learner.
///
/// Entries are append-only: never updated in place and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub id: EntryId,
    pub owner_id: OwnerId,
    pub word: String,
    pub definition: String,
    pub created_at: DateTime<Utc>,
}

impl VocabularyEntry {
    pub fn new(owner_id: OwnerId, word: String, definition: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            word,
            definition,
            created_at: Utc::now(),
        }
    }
}
