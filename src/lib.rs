//! Vocabulary reminders with spaced repetition.
//!
//! Learners save words with a definition; each save schedules reminders at
//! 24 hours, 3 days and 7 days. Answering "forgot" to a reminder starts the
//! cycle again. Pending reminders are kept on disk and survive restarts.

pub mod config;
pub mod messages;
pub mod persistence;
pub mod reminders;
pub mod scheduler;
pub mod telegram;
pub mod vocabulary;
