//! Durable storage for pending jobs
//!
//! All pending jobs live in a single JSON array on disk. The in-memory copy is
//! the source of truth while the process runs; every mutation is flushed before
//! it is acknowledged, so a restart resumes exactly the set of jobs that had not
//! yet been handed to a handler.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::models::{JobId, ScheduledJob};
use crate::persistence::{read_json_or_default, write_json_atomic};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Job store lock poisoned")]
    LockPoisoned,

    #[error("Scheduler is already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// File-backed set of pending jobs
pub struct JsonJobStore<P> {
    path: PathBuf,
    jobs: Mutex<Vec<ScheduledJob<P>>>,
}

impl<P> JsonJobStore<P>
where
    P: Serialize + DeserializeOwned + Clone,
{
    /// Open (or create) the job store at `path`, loading any jobs left by a previous run
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let jobs: Vec<ScheduledJob<P>> = read_json_or_default::<_, SchedulerError>(&path)?;
        if !jobs.is_empty() {
            log::info!("Job store: loaded {} pending job(s) from {}", jobs.len(), path.display());
        }

        Ok(Self {
            path,
            jobs: Mutex::new(jobs),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a new job. The job is only kept in memory if the write succeeded.
    pub fn insert(&self, job: ScheduledJob<P>) -> Result<JobId> {
        let mut jobs = self.jobs.lock().map_err(|_| SchedulerError::LockPoisoned)?;
        let id = job.id;
        jobs.push(job);

        if let Err(e) = write_json_atomic::<_, SchedulerError>(&self.path, &*jobs) {
            jobs.retain(|j| j.id != id);
            return Err(e);
        }

        Ok(id)
    }

    /// Remove and return every job due at `now`, oldest fire time first.
    ///
    /// The removal is flushed to disk before returning; if that fails the jobs
    /// stay pending and an error is returned, so a job is never handed out twice.
    pub fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob<P>>> {
        let mut jobs = self.jobs.lock().map_err(|_| SchedulerError::LockPoisoned)?;
        if !jobs.iter().any(|j| j.is_due(now)) {
            return Ok(Vec::new());
        }

        let (mut due, remaining): (Vec<_>, Vec<_>) =
            jobs.iter().cloned().partition(|j| j.is_due(now));
        write_json_atomic::<_, SchedulerError>(&self.path, &remaining)?;
        *jobs = remaining;

        due.sort_by(|a, b| a.fire_time.cmp(&b.fire_time));
        Ok(due)
    }

    /// Return jobs that were taken but whose handler never finished, so they
    /// fire again on the next run.
    pub fn restore(&self, returned: Vec<ScheduledJob<P>>) -> Result<()> {
        if returned.is_empty() {
            return Ok(());
        }

        let mut jobs = self.jobs.lock().map_err(|_| SchedulerError::LockPoisoned)?;
        let ids: Vec<JobId> = returned.iter().map(|j| j.id).collect();
        jobs.extend(returned);

        if let Err(e) = write_json_atomic::<_, SchedulerError>(&self.path, &*jobs) {
            jobs.retain(|j| !ids.contains(&j.id));
            return Err(e);
        }

        Ok(())
    }

    /// Snapshot of all pending jobs, ordered by fire time
    pub fn pending(&self) -> Result<Vec<ScheduledJob<P>>> {
        let jobs = self.jobs.lock().map_err(|_| SchedulerError::LockPoisoned)?;
        let mut pending = jobs.clone();
        pending.sort_by(|a, b| a.fire_time.cmp(&b.fire_time));
        Ok(pending)
    }

    /// Earliest fire time among pending jobs
    pub fn next_fire_time(&self) -> Result<Option<DateTime<Utc>>> {
        let jobs = self.jobs.lock().map_err(|_| SchedulerError::LockPoisoned)?;
        Ok(jobs.iter().map(|j| j.fire_time).min())
    }
}
