//! Reminder engine
//!
//! Owns the spaced-repetition loop. Every enrollment, and every "forgotten"
//! answer, schedules one burst: three one-shot jobs at +24h, +72h and +168h,
//! each carrying a snapshot of the word and definition. Bursts are scheduled
//! eagerly rather than chained, so a crash between two stages cannot drop the
//! rest of the cadence. The flip side is that later stages of a burst cannot be
//! withdrawn: a reminder may still fire after the learner already answered
//! "remembered" to an earlier one.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::dispatch::{DispatchError, NotificationDispatcher};
use super::models::{RecallOutcome, ReminderPayload, ReminderResponse, ReminderStage};
use super::render::render_reminder;
use crate::messages;
use crate::scheduler::{Clock, JobHandler, JobId, JobScheduler, ScheduledJob, SchedulerError};
use crate::vocabulary::{EntryId, OwnerId, VocabularyEntry, VocabularyStore, VocabularyStoreError};

/// Rejected enrollment input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("word is empty")]
    EmptyWord,

    #[error("definition is empty")]
    EmptyDefinition,

    #[error("word contains control characters")]
    UnprintableWord,

    #[error("word is too long for reminder answers")]
    WordTooLong,
}

impl ValidationError {
    /// Corrective prompt shown to the learner
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::EmptyWord => "The word is missing. Please send:\nword: ...\ndefinition: ...",
            ValidationError::EmptyDefinition => {
                "The definition is missing. Please send:\nword: ...\ndefinition: ..."
            }
            ValidationError::UnprintableWord => "The word can only contain printable characters.",
            ValidationError::WordTooLong => {
                "That word is too long for reminder buttons. Please send a shorter word."
            }
        }
    }
}

/// One stage of a burst could not be registered
#[derive(Error, Debug)]
#[error("failed to schedule {stage} reminder: {source}")]
pub struct SchedulingError {
    pub stage: ReminderStage,
    #[source]
    pub source: SchedulerError,
}

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] VocabularyStoreError),

    #[error("No reminder could be scheduled for entry {entry_id} ({} failures)", .failures.len())]
    BurstFailed {
        entry_id: EntryId,
        failures: Vec<SchedulingError>,
    },
}

impl ReminderError {
    /// Text shown to the learner; details stay in the logs
    pub fn user_message(&self) -> String {
        match self {
            ReminderError::Validation(e) => e.user_message().to_string(),
            _ => messages::GENERIC_FAILURE.to_string(),
        }
    }
}

/// Result of scheduling one burst
#[derive(Debug)]
pub struct BurstReport {
    pub burst_id: Uuid,
    pub scheduled: Vec<(ReminderStage, JobId)>,
    pub failures: Vec<SchedulingError>,
}

impl BurstReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_total_failure(&self) -> bool {
        self.scheduled.is_empty()
    }
}

/// Result of a successful enrollment
#[derive(Debug)]
pub struct Enrollment {
    pub entry_id: EntryId,
    pub burst: BurstReport,
}

/// Result of handling a reminder answer
#[derive(Debug)]
pub struct OutcomeReport {
    /// Text to show the learner in place of the reminder
    pub acknowledgement: String,
    /// The new burst, for a "forgotten" answer whose word is still on file
    pub rescheduled: Option<BurstReport>,
}

/// Spaced-repetition state machine over an injected store, scheduler and dispatcher
#[derive(Clone)]
pub struct ReminderEngine {
    store: Arc<dyn VocabularyStore>,
    scheduler: Arc<dyn JobScheduler<ReminderPayload>>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl ReminderEngine {
    pub fn new(
        store: Arc<dyn VocabularyStore>,
        scheduler: Arc<dyn JobScheduler<ReminderPayload>>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            scheduler,
            dispatcher,
            clock,
        }
    }

    /// Validate, persist and schedule the first burst for a new word.
    ///
    /// The entry stays saved even if no reminder could be scheduled; that case
    /// is reported as `ReminderError::BurstFailed`.
    pub fn enroll(
        &self,
        owner_id: &OwnerId,
        word: &str,
        definition: &str,
    ) -> Result<Enrollment, ReminderError> {
        let (word, definition) = validate(word, definition)?;

        let entry_id = self.store.save(owner_id, word, definition)?;
        log::info!("Reminder engine: saved '{}' for {} ({})", word, owner_id, entry_id);

        let burst = self.schedule_burst(owner_id, word, definition);
        if burst.is_total_failure() {
            return Err(ReminderError::BurstFailed {
                entry_id,
                failures: burst.failures,
            });
        }

        Ok(Enrollment { entry_id, burst })
    }

    /// Register one job per stage, each measured from now.
    ///
    /// Every stage is attempted even if an earlier one fails.
    pub fn schedule_burst(&self, owner_id: &OwnerId, word: &str, definition: &str) -> BurstReport {
        let now = self.clock.now();
        let burst_id = Uuid::new_v4();
        let mut scheduled = Vec::with_capacity(ReminderStage::ALL.len());
        let mut failures = Vec::new();

        for stage in ReminderStage::ALL {
            let fire_time = now + stage.offset();
            let payload = ReminderPayload {
                owner_id: owner_id.clone(),
                word: word.to_string(),
                definition: definition.to_string(),
                stage,
                burst_id,
            };

            match self.scheduler.register(fire_time, payload) {
                Ok(job_id) => {
                    log::debug!(
                        "Reminder engine: {} reminder for '{}' at {} (job {})",
                        stage,
                        word,
                        fire_time,
                        job_id
                    );
                    scheduled.push((stage, job_id));
                }
                Err(source) => {
                    log::warn!(
                        "Reminder engine: could not schedule {} reminder for '{}' ({}): {}",
                        stage,
                        word,
                        owner_id,
                        source
                    );
                    failures.push(SchedulingError { stage, source });
                }
            }
        }

        if scheduled.is_empty() {
            log::error!(
                "Reminder engine: burst {} for '{}' ({}) failed entirely",
                burst_id,
                word,
                owner_id
            );
        } else {
            log::info!(
                "Reminder engine: scheduled {}/{} reminders for '{}' ({})",
                scheduled.len(),
                ReminderStage::ALL.len(),
                word,
                owner_id
            );
        }

        BurstReport {
            burst_id,
            scheduled,
            failures,
        }
    }

    /// Send a fired reminder. Does not wait for the learner's answer.
    pub async fn on_fire(&self, payload: &ReminderPayload) -> Result<(), DispatchError> {
        let notice = render_reminder(payload);
        self.dispatcher.send(&payload.owner_id, &notice).await?;
        log::info!(
            "Reminder engine: sent {} reminder for '{}' to {}",
            payload.stage,
            payload.word,
            payload.owner_id
        );
        Ok(())
    }

    /// Handle the learner's answer to a reminder.
    ///
    /// "Remembered" ends the cycle. "Forgotten" starts a fresh burst from now,
    /// using the latest saved definition of the word.
    pub fn on_outcome(
        &self,
        owner_id: &OwnerId,
        word: &str,
        outcome: RecallOutcome,
    ) -> Result<OutcomeReport, ReminderError> {
        let acknowledgement = messages::acknowledgement(outcome, word);

        let rescheduled = match outcome {
            RecallOutcome::Remembered => {
                log::info!("Reminder engine: {} remembered '{}'", owner_id, word);
                None
            }
            RecallOutcome::Forgotten => match self.store.find_latest(owner_id, word)? {
                Some(definition) => {
                    log::info!("Reminder engine: {} forgot '{}', restarting cycle", owner_id, word);
                    Some(self.schedule_burst(owner_id, word, &definition))
                }
                None => {
                    log::warn!(
                        "Reminder engine: no saved entry for '{}' ({}), not rescheduling",
                        word,
                        owner_id
                    );
                    None
                }
            },
        };

        Ok(OutcomeReport {
            acknowledgement,
            rescheduled,
        })
    }

    /// Saved words of an owner, oldest first
    pub fn list(&self, owner_id: &OwnerId) -> Result<Vec<VocabularyEntry>, ReminderError> {
        Ok(self.store.list(owner_id)?)
    }
}

#[async_trait]
impl JobHandler<ReminderPayload> for ReminderEngine {
    async fn fire(&self, job: ScheduledJob<ReminderPayload>) {
        if let Err(e) = self.on_fire(&job.payload).await {
            log::error!(
                "Reminder engine: failed to deliver job {} ('{}' to {}): {}",
                job.id,
                job.payload.word,
                job.payload.owner_id,
                e
            );
        }
    }
}

fn validate<'a>(word: &'a str, definition: &'a str) -> Result<(&'a str, &'a str), ValidationError> {
    let word = word.trim();
    let definition = definition.trim();

    if word.is_empty() {
        return Err(ValidationError::EmptyWord);
    }
    if word.chars().any(char::is_control) {
        return Err(ValidationError::UnprintableWord);
    }
    if !ReminderResponse::fits(word) {
        return Err(ValidationError::WordTooLong);
    }
    if definition.is_empty() {
        return Err(ValidationError::EmptyDefinition);
    }

    Ok((word, definition))
}
