//! JSON file helpers shared by the file-backed stores, and the lock that keeps
//! a data directory to a single writing process.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

const LOCK_FILE: &str = ".wordloop.lock";

/// Read a JSON document, falling back to `T::default()` when the file does not exist yet.
pub fn read_json_or_default<T, E>(path: &Path) -> Result<T, E>
where
    T: DeserializeOwned + Default,
    E: From<io::Error> + From<serde_json::Error>,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&content)?)
}

/// Write a JSON document by writing a sibling temp file and renaming it over the target,
/// so a crash mid-write never leaves a truncated file behind.
pub fn write_json_atomic<T, E>(path: &Path, data: &T) -> Result<(), E>
where
    T: Serialize + ?Sized,
    E: From<io::Error> + From<serde_json::Error>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(data)?;
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    // Persist the rename itself
    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[derive(Error, Debug)]
pub enum LockError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Data directory {} is in use by another wordloop process", .0.display())]
    Held(PathBuf),
}

/// Exclusive advisory lock on a data directory, released on drop.
///
/// The stores cache their files in memory and rewrite them whole, so two
/// processes writing the same directory would silently overwrite each other.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    dir: PathBuf,
}

impl DataDirLock {
    /// Take the lock without waiting; fails with `LockError::Held` if another
    /// process (or another handle in this one) holds it.
    pub fn acquire(dir: &Path) -> Result<Self, LockError> {
        fs::create_dir_all(dir)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                file,
                dir: dir.to_path_buf(),
            }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::Held(dir.to_path_buf()))
            }
            Err(e) => Err(LockError::Io(e)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to release lock on {}: {}", self.dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct TestError;

    impl From<io::Error> for TestError {
        fn from(_: io::Error) -> Self {
            TestError
        }
    }

    impl From<serde_json::Error> for TestError {
        fn from(_: serde_json::Error) -> Self {
            TestError
        }
    }

    #[test]
    fn test_missing_file_reads_default() {
        let temp = TempDir::new().unwrap();
        let values: Vec<String> =
            read_json_or_default::<_, TestError>(&temp.path().join("absent.json")).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("data.json");

        write_json_atomic::<_, TestError>(&path, &vec!["a".to_string()]).unwrap();
        write_json_atomic::<_, TestError>(&path, &vec!["b".to_string(), "c".to_string()]).unwrap();

        let values: Vec<String> = read_json_or_default::<_, TestError>(&path).unwrap();
        assert_eq!(values, vec!["b".to_string(), "c".to_string()]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        fs::write(&path, "{not json").unwrap();

        let result: Result<Vec<String>, TestError> = read_json_or_default(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_leftover_temp_file_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        fs::write(path.with_extension("json.tmp"), "half a docu").unwrap();

        write_json_atomic::<_, TestError>(&path, &vec!["fresh".to_string()]).unwrap();

        let values: Vec<String> = read_json_or_default::<_, TestError>(&path).unwrap();
        assert_eq!(values, vec!["fresh".to_string()]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_data_dir_lock_is_exclusive() {
        let temp = TempDir::new().unwrap();

        let lock = DataDirLock::acquire(temp.path()).unwrap();
        assert!(matches!(
            DataDirLock::acquire(temp.path()),
            Err(LockError::Held(_))
        ));

        drop(lock);
        assert!(DataDirLock::acquire(temp.path()).is_ok());
    }
}
