//! Scheduler runtime
//!
//! Fires persisted one-shot jobs using tokio timers. A single background loop
//! sleeps until the earliest pending fire time (or until a new job is
//! registered), claims every due job from the store and hands each one to the
//! handler on its own task. Handler tasks are tracked so that `stop` can wait
//! for them; a job whose handler is still running when the drain timeout
//! expires goes back to the store and fires again on the next start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use super::clock::Clock;
use super::job_store::{JsonJobStore, Result, SchedulerError};
use super::models::{JobId, ScheduledJob};

/// Longest the loop sleeps before re-checking the store, which also bounds how
/// late a job can fire after the wall clock jumps forward.
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Delay before retrying after the store could not be updated
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// How long `stop` waits for in-flight handlers by default
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Receives every job the runtime fires
#[async_trait]
pub trait JobHandler<P>: Send + Sync + 'static {
    async fn fire(&self, job: ScheduledJob<P>);
}

/// Registration side of the runtime
pub trait JobScheduler<P>: Send + Sync {
    /// Durably register a one-shot job that fires at or after `fire_time`
    fn register(&self, fire_time: DateTime<Utc>, payload: P) -> Result<JobId>;
}

/// Message types for scheduler communication
#[derive(Debug)]
enum SchedulerMessage {
    /// A job was added, recompute the next wake-up
    Registered,
    /// Stop the loop
    Shutdown,
}

struct RunningLoop {
    sender: mpsc::Sender<SchedulerMessage>,
    task: JoinHandle<()>,
}

/// Durable one-shot job runtime with an explicit start/stop lifecycle
pub struct SchedulerRuntime<P> {
    store: Arc<JsonJobStore<P>>,
    clock: Arc<dyn Clock>,
    drain_timeout: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl<P> SchedulerRuntime<P>
where
    P: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(store: JsonJobStore<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(store),
            clock,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            running: Mutex::new(None),
        }
    }

    /// How long `stop` waits for running handlers before returning their jobs to the store
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Start the scheduler loop in a background task.
    ///
    /// Must be called from within a tokio runtime. Jobs that became due while
    /// the runtime was stopped fire immediately.
    pub fn start(&self, handler: Arc<dyn JobHandler<P>>) -> Result<()> {
        let mut running = self.running.lock().map_err(|_| SchedulerError::LockPoisoned)?;
        if running.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel(32);
        let scheduler = SchedulerLoop {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            handler,
            in_flight: InFlight::default(),
            drain_timeout: self.drain_timeout,
        };

        let task = tokio::spawn(scheduler.run(rx));

        *running = Some(RunningLoop { sender: tx, task });
        log::info!("Scheduler: started");
        Ok(())
    }

    /// Stop the scheduler loop and wait for it to exit.
    ///
    /// Waits up to the drain timeout for jobs already handed to the handler.
    /// Jobs still running after that are returned to the store.
    pub async fn stop(&self) {
        let running = match self.running.lock() {
            Ok(mut running) => running.take(),
            Err(_) => {
                log::error!("Scheduler: lock poisoned, cannot stop");
                return;
            }
        };

        let Some(RunningLoop { sender, task }) = running else {
            return;
        };

        let _ = sender.send(SchedulerMessage::Shutdown).await;
        if let Err(e) = task.await {
            log::error!("Scheduler: loop task ended abnormally: {}", e);
        }
        log::info!("Scheduler: stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().map(|r| r.is_some()).unwrap_or(false)
    }

    /// Snapshot of pending jobs ordered by fire time
    pub fn pending(&self) -> Result<Vec<ScheduledJob<P>>> {
        self.store.pending()
    }

    fn notify_registered(&self) {
        if let Ok(running) = self.running.lock() {
            if let Some(running) = running.as_ref() {
                // A full channel already guarantees a pending wake-up
                let _ = running.sender.try_send(SchedulerMessage::Registered);
            }
        }
    }
}

impl<P> JobScheduler<P> for SchedulerRuntime<P>
where
    P: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn register(&self, fire_time: DateTime<Utc>, payload: P) -> Result<JobId> {
        let job = ScheduledJob::new(fire_time, payload, self.clock.now());
        let id = self.store.insert(job)?;
        log::debug!("Scheduler: registered job {} for {}", id, fire_time);
        self.notify_registered();
        Ok(id)
    }
}

/// Handler tasks that have been spawned but not yet joined
struct InFlight<P> {
    tasks: JoinSet<JobId>,
    jobs: HashMap<JobId, ScheduledJob<P>>,
}

impl<P> Default for InFlight<P> {
    fn default() -> Self {
        Self {
            tasks: JoinSet::new(),
            jobs: HashMap::new(),
        }
    }
}

impl<P> InFlight<P> {
    fn record(&mut self, result: std::result::Result<JobId, tokio::task::JoinError>) {
        match result {
            Ok(id) => {
                self.jobs.remove(&id);
            }
            // The job stays recorded, so a shutdown returns it to the store
            Err(e) if e.is_cancelled() => log::debug!("Scheduler: handler task aborted"),
            Err(e) => log::error!("Scheduler: handler task failed: {}", e),
        }
    }
}

struct SchedulerLoop<P> {
    store: Arc<JsonJobStore<P>>,
    clock: Arc<dyn Clock>,
    handler: Arc<dyn JobHandler<P>>,
    in_flight: InFlight<P>,
    drain_timeout: Duration,
}

impl<P> SchedulerLoop<P>
where
    P: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Main scheduler loop
    async fn run(mut self, mut receiver: mpsc::Receiver<SchedulerMessage>) {
        loop {
            let wait_duration = self.fire_due();
            let deadline = tokio::time::Instant::now() + wait_duration;

            // Reap finished handlers until it is time to look at the store again
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,

                    Some(result) = self.in_flight.tasks.join_next(), if !self.in_flight.tasks.is_empty() => {
                        self.in_flight.record(result);
                    }

                    msg = receiver.recv() => {
                        match msg {
                            Some(SchedulerMessage::Registered) => break,
                            Some(SchedulerMessage::Shutdown) | None => {
                                log::info!("Scheduler: shutting down");
                                self.drain().await;
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Claim due jobs, spawn their handlers and return how long to sleep
    fn fire_due(&mut self) -> Duration {
        match self.store.take_due(self.clock.now()) {
            Ok(due) => {
                for job in due {
                    log::info!("Scheduler: firing job {} (due {})", job.id, job.fire_time);
                    let id = job.id;
                    let handler = Arc::clone(&self.handler);
                    self.in_flight.jobs.insert(id, job.clone());
                    self.in_flight.tasks.spawn(async move {
                        handler.fire(job).await;
                        id
                    });
                }
                next_wait(&self.store, self.clock.as_ref())
            }
            Err(e) => {
                log::error!("Scheduler: failed to claim due jobs: {}", e);
                RETRY_DELAY
            }
        }
    }

    /// Wait for in-flight handlers, then return unfinished jobs to the store
    async fn drain(&mut self) {
        if self.in_flight.tasks.is_empty() {
            return;
        }

        log::info!(
            "Scheduler: waiting for {} in-flight job(s)",
            self.in_flight.tasks.len()
        );

        let in_flight = &mut self.in_flight;
        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(result) = in_flight.tasks.join_next().await {
                in_flight.record(result);
            }
        })
        .await;

        if drained.is_err() {
            self.in_flight.tasks.abort_all();
            // Tasks that finished before the abort still report their id
            while let Some(result) = self.in_flight.tasks.join_next().await {
                self.in_flight.record(result);
            }
        }

        let unfinished: Vec<ScheduledJob<P>> = self.in_flight.jobs.drain().map(|(_, job)| job).collect();
        if unfinished.is_empty() {
            return;
        }

        log::warn!(
            "Scheduler: returning {} unfinished job(s) to the store",
            unfinished.len()
        );
        if let Err(e) = self.store.restore(unfinished) {
            log::error!("Scheduler: failed to return unfinished jobs: {}", e);
        }
    }
}

/// How long to sleep until the earliest pending job, capped at `MAX_SLEEP`
fn next_wait<P>(store: &JsonJobStore<P>, clock: &dyn Clock) -> Duration
where
    P: Serialize + DeserializeOwned + Clone,
{
    match store.next_fire_time() {
        Ok(Some(next)) => (next - clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(MAX_SLEEP),
        Ok(None) => MAX_SLEEP,
        Err(e) => {
            log::error!("Scheduler: failed to read next fire time: {}", e);
            RETRY_DELAY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::clock::SystemClock;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedSender;

    struct ChannelHandler {
        fired: UnboundedSender<ScheduledJob<String>>,
    }

    #[async_trait]
    impl JobHandler<String> for ChannelHandler {
        async fn fire(&self, job: ScheduledJob<String>) {
            let _ = self.fired.send(job);
        }
    }

    fn open_runtime(temp_dir: &TempDir) -> SchedulerRuntime<String> {
        let store = JsonJobStore::open(temp_dir.path().join("jobs.json")).unwrap();
        SchedulerRuntime::new(store, Arc::new(SystemClock))
    }

    fn channel_handler() -> (
        Arc<dyn JobHandler<String>>,
        mpsc::UnboundedReceiver<ScheduledJob<String>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelHandler { fired: tx }), rx)
    }

    async fn next_fired(
        rx: &mut mpsc::UnboundedReceiver<ScheduledJob<String>>,
    ) -> Option<ScheduledJob<String>> {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_overdue_job_fires_on_start() {
        let temp = TempDir::new().unwrap();
        let runtime = open_runtime(&temp);
        let (handler, mut rx) = channel_handler();

        runtime
            .register(Utc::now() - ChronoDuration::seconds(1), "overdue".to_string())
            .unwrap();
        runtime.start(handler).unwrap();

        let fired = next_fired(&mut rx).await.expect("job should fire");
        assert_eq!(fired.payload, "overdue");
        assert!(runtime.pending().unwrap().is_empty());

        runtime.stop().await;
    }

    #[tokio::test]
    async fn test_job_registered_while_running_fires_after_its_time() {
        let temp = TempDir::new().unwrap();
        let runtime = open_runtime(&temp);
        let (handler, mut rx) = channel_handler();
        runtime.start(handler).unwrap();

        let fire_time = Utc::now() + ChronoDuration::milliseconds(200);
        runtime.register(fire_time, "soon".to_string()).unwrap();
        runtime
            .register(Utc::now() + ChronoDuration::days(7), "next week".to_string())
            .unwrap();

        let fired = next_fired(&mut rx).await.expect("job should fire");
        assert_eq!(fired.payload, "soon");
        assert!(Utc::now() >= fire_time);

        // The far-future job is still pending and nothing else fired
        assert!(tokio::time::timeout(Duration::from_millis(300), rx.recv())
            .await
            .is_err());
        let pending = runtime.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, "next week");

        runtime.stop().await;
    }

    #[tokio::test]
    async fn test_nothing_fires_while_stopped() {
        let temp = TempDir::new().unwrap();
        let runtime = open_runtime(&temp);
        let (handler, mut rx) = channel_handler();

        runtime.start(Arc::clone(&handler)).unwrap();
        runtime.stop().await;
        assert!(!runtime.is_running());

        runtime
            .register(Utc::now() - ChronoDuration::seconds(1), "queued".to_string())
            .unwrap();
        assert!(tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .is_err());
        assert_eq!(runtime.pending().unwrap().len(), 1);

        runtime.start(handler).unwrap();
        let fired = next_fired(&mut rx).await.expect("job should fire after restart");
        assert_eq!(fired.payload, "queued");
        runtime.stop().await;
    }

    #[tokio::test]
    async fn test_pending_jobs_survive_process_restart() {
        let temp = TempDir::new().unwrap();

        {
            let runtime = open_runtime(&temp);
            runtime
                .register(Utc::now() + ChronoDuration::milliseconds(100), "durable".to_string())
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(150)).await;

        let runtime = open_runtime(&temp);
        let (handler, mut rx) = channel_handler();
        runtime.start(handler).unwrap();

        let fired = next_fired(&mut rx).await.expect("persisted job should fire");
        assert_eq!(fired.payload, "durable");
        runtime.stop().await;

        // Fired exactly once: a third incarnation finds nothing to run
        let runtime = open_runtime(&temp);
        assert!(runtime.pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let temp = TempDir::new().unwrap();
        let runtime = open_runtime(&temp);
        let (handler, _rx) = channel_handler();

        runtime.start(Arc::clone(&handler)).unwrap();
        assert!(matches!(
            runtime.start(handler),
            Err(SchedulerError::AlreadyRunning)
        ));
        runtime.stop().await;
    }

    #[tokio::test]
    async fn test_slow_handler_does_not_block_other_jobs() {
        struct SlowFirst {
            fired: UnboundedSender<ScheduledJob<String>>,
        }

        #[async_trait]
        impl JobHandler<String> for SlowFirst {
            async fn fire(&self, job: ScheduledJob<String>) {
                if job.payload == "slow" {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                let _ = self.fired.send(job);
            }
        }

        let temp = TempDir::new().unwrap();
        let runtime = open_runtime(&temp).with_drain_timeout(Duration::from_millis(100));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let now = Utc::now();
        runtime
            .register(now - ChronoDuration::seconds(2), "slow".to_string())
            .unwrap();
        runtime
            .register(now - ChronoDuration::seconds(1), "fast".to_string())
            .unwrap();
        runtime.start(Arc::new(SlowFirst { fired: tx })).unwrap();

        let fired = next_fired(&mut rx).await.expect("fast job should not wait");
        assert_eq!(fired.payload, "fast");
        runtime.stop().await;
    }

    struct SleepyHandler {
        delay: Duration,
        fired: UnboundedSender<ScheduledJob<String>>,
    }

    #[async_trait]
    impl JobHandler<String> for SleepyHandler {
        async fn fire(&self, job: ScheduledJob<String>) {
            tokio::time::sleep(self.delay).await;
            let _ = self.fired.send(job);
        }
    }

    #[tokio::test]
    async fn test_stop_waits_for_in_flight_jobs() {
        let temp = TempDir::new().unwrap();
        let runtime = open_runtime(&temp);
        let (tx, mut rx) = mpsc::unbounded_channel();

        runtime
            .register(Utc::now() - ChronoDuration::seconds(1), "in flight".to_string())
            .unwrap();
        runtime
            .start(Arc::new(SleepyHandler {
                delay: Duration::from_millis(300),
                fired: tx,
            }))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        runtime.stop().await;

        // Delivered before stop returned, and not pending any more
        let fired = rx.try_recv().expect("handler should finish before stop returns");
        assert_eq!(fired.payload, "in flight");
        assert!(open_runtime(&temp).pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unfinished_job_returns_to_store_on_stop() {
        let temp = TempDir::new().unwrap();
        let runtime = open_runtime(&temp).with_drain_timeout(Duration::from_millis(100));
        let (tx, mut rx) = mpsc::unbounded_channel();

        runtime
            .register(Utc::now() - ChronoDuration::seconds(1), "interrupted".to_string())
            .unwrap();
        runtime
            .start(Arc::new(SleepyHandler {
                delay: Duration::from_secs(3600),
                fired: tx,
            }))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(runtime.pending().unwrap().is_empty());
        runtime.stop().await;
        assert!(rx.try_recv().is_err());

        // The next process finds it again and fires it
        let restarted = open_runtime(&temp);
        let pending = restarted.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, "interrupted");

        let (handler, mut rx) = channel_handler();
        restarted.start(handler).unwrap();
        let fired = next_fired(&mut rx).await.expect("restored job should fire");
        assert_eq!(fired.payload, "interrupted");
        restarted.stop().await;
    }
}
