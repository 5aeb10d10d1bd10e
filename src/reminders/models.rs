//! Data models for the reminder cycle

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vocabulary::OwnerId;

/// File in the data directory holding pending reminder jobs
pub const REMINDER_JOBS_FILE: &str = "reminder_jobs.json";

/// Upper bound on encoded response data; Telegram rejects longer button data
pub const MAX_RESPONSE_DATA_BYTES: usize = 64;

/// One of the three fixed delays of a reminder burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderStage {
    /// 24 hours after scheduling
    After24Hours,
    /// 3 days after scheduling
    After3Days,
    /// 7 days after scheduling
    After7Days,
}

impl ReminderStage {
    /// Every stage of a burst, earliest first
    pub const ALL: [ReminderStage; 3] = [
        ReminderStage::After24Hours,
        ReminderStage::After3Days,
        ReminderStage::After7Days,
    ];

    /// Delay from scheduling time
    pub fn offset(self) -> Duration {
        match self {
            ReminderStage::After24Hours => Duration::hours(24),
            ReminderStage::After3Days => Duration::hours(72),
            ReminderStage::After7Days => Duration::hours(168),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReminderStage::After24Hours => "24h",
            ReminderStage::After3Days => "3d",
            ReminderStage::After7Days => "7d",
        }
    }
}

impl fmt::Display for ReminderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot carried by a scheduled reminder.
///
/// Captured when the burst is scheduled and never re-read from the store, so a
/// later save of the same word does not change what an already queued reminder shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub owner_id: OwnerId,
    pub word: String,
    pub definition: String,
    pub stage: ReminderStage,
    /// Shared by the three jobs of one burst
    pub burst_id: Uuid,
}

/// The learner's self-assessment after seeing a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecallOutcome {
    Remembered,
    Forgotten,
}

impl RecallOutcome {
    /// Token used in response callback data
    pub fn token(self) -> &'static str {
        match self {
            RecallOutcome::Remembered => "remember",
            RecallOutcome::Forgotten => "forgot",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "remember" => Some(RecallOutcome::Remembered),
            "forgot" => Some(RecallOutcome::Forgotten),
            _ => None,
        }
    }
}

/// A pressed response button: which outcome, for which word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderResponse {
    pub outcome: RecallOutcome,
    pub word: String,
}

impl ReminderResponse {
    pub fn new(outcome: RecallOutcome, word: impl Into<String>) -> Self {
        Self {
            outcome,
            word: word.into(),
        }
    }

    /// Encode as `token|word`
    pub fn to_callback_data(&self) -> String {
        format!("{}|{}", self.outcome.token(), self.word)
    }

    /// Whether both answers for `word` encode within `MAX_RESPONSE_DATA_BYTES`
    pub fn fits(word: &str) -> bool {
        [RecallOutcome::Remembered, RecallOutcome::Forgotten]
            .into_iter()
            .all(|outcome| Self::new(outcome, word).to_callback_data().len() <= MAX_RESPONSE_DATA_BYTES)
    }

    /// Decode `token|word`. The word is everything after the first separator,
    /// so words containing `|` survive.
    pub fn parse(data: &str) -> Option<Self> {
        let (token, word) = data.split_once('|')?;
        let outcome = RecallOutcome::from_token(token)?;
        if word.is_empty() {
            return None;
        }
        Some(Self::new(outcome, word))
    }
}
