//! Durable delayed-execution runtime
//!
//! This module provides:
//! - A JSON-file job store that survives process restarts
//! - A tokio-driven runtime that fires each job once, at or after its fire time
//! - The `JobScheduler` / `JobHandler` seams the reminder engine plugs into

pub mod clock;
pub mod job_store;
pub mod models;
pub mod runtime;

pub use clock::{Clock, SystemClock};
pub use job_store::{JsonJobStore, SchedulerError};
pub use models::{JobId, ScheduledJob};
pub use runtime::{JobHandler, JobScheduler, SchedulerRuntime};
