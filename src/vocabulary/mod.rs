//! Saved vocabulary for each learner
//!
//! This module provides:
//! - The append-only `VocabularyStore` contract and its JSON-file implementation
//! - Parsing of "word: … / definition: …" submissions

pub mod intake;
pub mod models;
pub mod storage;

pub use intake::{parse_submission, Submission};
pub use models::*;
pub use storage::{JsonVocabularyStore, VocabularyStore, VocabularyStoreError};
