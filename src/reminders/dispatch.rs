//! Outbound reminder delivery
//!
//! The engine never talks to a transport directly. It renders a `ReminderNotice`
//! and hands it to whatever `NotificationDispatcher` it was built with.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{RecallOutcome, ReminderResponse};
use crate::vocabulary::OwnerId;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// A response button shown under a reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAction {
    pub label: String,
    pub response: ReminderResponse,
}

impl ResponseAction {
    pub fn callback_data(&self) -> String {
        self.response.to_callback_data()
    }

    pub fn outcome(&self) -> RecallOutcome {
        self.response.outcome
    }
}

/// A rendered reminder, ready for a transport to format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotice {
    pub title: String,
    pub word: String,
    pub definition: String,
    /// The transport must keep the definition hidden until the learner reveals it
    pub definition_obscured: bool,
    pub actions: Vec<ResponseAction>,
}

/// Delivers rendered reminders to a learner
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, owner_id: &OwnerId, notice: &ReminderNotice) -> Result<(), DispatchError>;
}

/// Dispatcher that only writes reminders to the log, definition masked.
///
/// Used by offline commands that build an engine but never run the scheduler.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, owner_id: &OwnerId, notice: &ReminderNotice) -> Result<(), DispatchError> {
        let definition = if notice.definition_obscured {
            "\u{2588}".repeat(notice.definition.chars().count().min(12))
        } else {
            notice.definition.clone()
        };
        let actions: Vec<&str> = notice.actions.iter().map(|a| a.label.as_str()).collect();

        log::info!(
            "Reminder for {}: {} [{}: {}] ({})",
            owner_id,
            notice.title,
            notice.word,
            definition,
            actions.join(" / ")
        );
        Ok(())
    }
}
