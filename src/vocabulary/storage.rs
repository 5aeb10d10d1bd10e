//! Storage for saved vocabulary
//!
//! File layout inside the data directory:
//! ```text
//! {data_dir}/
//! └── vocabulary.json   # Array of all entries, in insertion order
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use super::models::{EntryId, OwnerId, VocabularyEntry};
use crate::persistence::{read_json_or_default, write_json_atomic};

/// File name of the vocabulary document inside the data directory
pub const VOCABULARY_FILE: &str = "vocabulary.json";

#[derive(Error, Debug)]
pub enum VocabularyStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Vocabulary store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, VocabularyStoreError>;

/// Durable record store for (owner, word, definition) entries
pub trait VocabularyStore: Send + Sync {
    /// Append a new entry. Duplicate words are allowed.
    fn save(&self, owner_id: &OwnerId, word: &str, definition: &str) -> Result<EntryId>;

    /// All entries of an owner in the order they were saved
    fn list(&self, owner_id: &OwnerId) -> Result<Vec<VocabularyEntry>>;

    /// Definition of the most recently saved entry for (owner, word)
    fn find_latest(&self, owner_id: &OwnerId, word: &str) -> Result<Option<String>>;
}

/// Vocabulary store backed by a single JSON file
pub struct JsonVocabularyStore {
    path: PathBuf,
    entries: Mutex<Vec<VocabularyEntry>>,
}

impl JsonVocabularyStore {
    /// Open the store in `data_dir`, loading previously saved entries
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(VOCABULARY_FILE);
        let entries: Vec<VocabularyEntry> = read_json_or_default::<_, VocabularyStoreError>(&path)?;
        log::debug!("Vocabulary store: loaded {} entries from {}", entries.len(), path.display());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VocabularyStore for JsonVocabularyStore {
    fn save(&self, owner_id: &OwnerId, word: &str, definition: &str) -> Result<EntryId> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| VocabularyStoreError::LockPoisoned)?;

        let entry = VocabularyEntry::new(owner_id.clone(), word.to_string(), definition.to_string());
        let id = entry.id;
        entries.push(entry);

        // Keep memory and disk in agreement when the write fails
        if let Err(e) = write_json_atomic::<_, VocabularyStoreError>(&self.path, &*entries) {
            entries.pop();
            return Err(e);
        }

        Ok(id)
    }

    fn list(&self, owner_id: &OwnerId) -> Result<Vec<VocabularyEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| VocabularyStoreError::LockPoisoned)?;

        Ok(entries
            .iter()
            .filter(|e| &e.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn find_latest(&self, owner_id: &OwnerId, word: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| VocabularyStoreError::LockPoisoned)?;

        Ok(entries
            .iter()
            .rev()
            .find(|e| &e.owner_id == owner_id && e.word == word)
            .map(|e| e.definition.clone()))
    }
}
