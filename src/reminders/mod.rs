//! Spaced-repetition reminders
//!
//! This module provides:
//! - Reminder stages (24h, 3 days, 7 days) and the snapshot payload each job carries
//! - The reminder engine: enrollment, burst scheduling, firing and answer handling
//! - The dispatcher seam used to deliver rendered reminders

pub mod dispatch;
pub mod engine;
pub mod models;
pub mod render;

pub use dispatch::{DispatchError, LogDispatcher, NotificationDispatcher, ReminderNotice, ResponseAction};
pub use engine::{
    BurstReport, Enrollment, OutcomeReport, ReminderEngine, ReminderError, SchedulingError,
    ValidationError,
};
pub use models::*;
pub use render::render_reminder;
