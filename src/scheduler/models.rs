//! Data models for scheduled jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle of a registered job
pub type JobId = Uuid;

/// A one-shot job persisted until it fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob<P> {
    pub id: JobId,
    /// Earliest moment the job may fire
    pub fire_time: DateTime<Utc>,
    pub payload: P,
    pub registered_at: DateTime<Utc>,
}

impl<P> ScheduledJob<P> {
    pub fn new(fire_time: DateTime<Utc>, payload: P, registered_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fire_time,
            payload,
            registered_at,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_time <= now
    }
}
