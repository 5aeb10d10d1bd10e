use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use wordloop_lib::config::Config;
use wordloop_lib::persistence::DataDirLock;
use wordloop_lib::reminders::{
    NotificationDispatcher, ReminderEngine, ReminderPayload, REMINDER_JOBS_FILE,
};
use wordloop_lib::scheduler::{Clock, JsonJobStore, SchedulerRuntime, SystemClock};
use wordloop_lib::vocabulary::JsonVocabularyStore;

/// Shared application state for CLI commands
pub struct App {
    pub config: Config,
    pub data_dir: PathBuf,
    pub vocabulary: Arc<JsonVocabularyStore>,
    pub scheduler: Arc<SchedulerRuntime<ReminderPayload>>,
    pub clock: Arc<dyn Clock>,
    /// Held for the app's lifetime by commands that write to the stores
    _lock: Option<DataDirLock>,
}

impl App {
    /// Load config and open both stores under the data directory.
    ///
    /// With `exclusive`, the data directory lock is taken before the stores
    /// are read, so a second writer fails instead of clobbering the files.
    pub fn new(config_path: Option<&Path>, data_dir: Option<&Path>, exclusive: bool) -> Result<Self> {
        let mut config = Config::load(config_path).context("Failed to load config")?;
        if let Some(dir) = data_dir {
            config.data_dir = Some(dir.to_path_buf());
        }

        let data_dir = config
            .resolve_data_dir()
            .context("Failed to get data directory")?;

        let lock = if exclusive {
            Some(DataDirLock::acquire(&data_dir).context("Failed to lock data directory")?)
        } else {
            None
        };

        let vocabulary = JsonVocabularyStore::open(&data_dir)
            .context("Failed to open vocabulary store")?;

        let job_store: JsonJobStore<ReminderPayload> =
            JsonJobStore::open(data_dir.join(REMINDER_JOBS_FILE))
                .context("Failed to open reminder job store")?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let scheduler = Arc::new(SchedulerRuntime::new(job_store, clock.clone()));

        log::debug!("Using data directory {}", data_dir.display());

        Ok(Self {
            config,
            data_dir,
            vocabulary: Arc::new(vocabulary),
            scheduler,
            clock,
            _lock: lock,
        })
    }

    /// Engine wired to this app's stores and the given dispatcher
    pub fn engine(&self, dispatcher: Arc<dyn NotificationDispatcher>) -> ReminderEngine {
        ReminderEngine::new(
            self.vocabulary.clone(),
            self.scheduler.clone(),
            dispatcher,
            self.clock.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wordloop_lib::persistence::LockError;

    #[test]
    fn test_second_writer_is_refused_while_locked() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("missing.toml");

        let running = App::new(Some(&config), Some(temp.path()), true).unwrap();

        let err = App::new(Some(&config), Some(temp.path()), true).err().unwrap();
        assert!(matches!(err.downcast_ref::<LockError>(), Some(LockError::Held(_))));

        // Readers don't take the lock
        assert!(App::new(Some(&config), Some(temp.path()), false).is_ok());

        drop(running);
        assert!(App::new(Some(&config), Some(temp.path()), true).is_ok());
    }
}
