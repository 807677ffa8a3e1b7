//! Durable key-value storage for the task snapshot.
//!
//! The whole task collection lives under a single key as one JSON array. The
//! file backend maps the key to `<key>.json` inside the data directory and
//! writes through a temporary file and a rename so a crash mid-write leaves
//! the previous snapshot intact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::{cell::RefCell, rc::Rc};

use chrono::Local;

use crate::error::StoreResult;
use crate::task::Task;

/// Key under which the task collection is stored.
pub const STORAGE_KEY: &str = "tasks";

/// A place that holds the serialized snapshot.
pub trait SnapshotStorage {
    /// Read the raw snapshot, `None` when nothing has been stored yet.
    fn read(&self) -> StoreResult<Option<String>>;

    /// Replace the stored snapshot.
    fn write(&mut self, data: &str) -> StoreResult<()>;

    /// Keep a copy of an unreadable snapshot before it gets overwritten.
    /// Returns where the copy went, if anywhere.
    fn preserve_corrupt(&mut self) -> StoreResult<Option<PathBuf>> {
        Ok(None)
    }

    /// Human-readable location, for diagnostics.
    fn describe(&self) -> String;
}

/// Snapshot stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Store the snapshot at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStorage for FileStorage {
    fn read(&self) -> StoreResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    /// Atomic-ish write via temp + rename.
    fn write(&mut self, data: &str) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn preserve_corrupt(&mut self) -> StoreResult<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(STORAGE_KEY);
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let backup = self
            .path
            .with_file_name(format!("{}.corrupt-{}.json", stem, timestamp));
        fs::copy(&self.path, &backup)?;
        Ok(Some(backup))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process storage. Clones share the same slot, which lets a test keep a
/// handle on what the store wrote.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Rc<RefCell<Option<String>>>,
    fail_writes: Rc<RefCell<bool>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a raw snapshot.
    pub fn with_contents(data: &str) -> Self {
        let storage = Self::default();
        *storage.slot.borrow_mut() = Some(data.to_string());
        storage
    }

    /// Current raw contents.
    pub fn contents(&self) -> Option<String> {
        self.slot.borrow().clone()
    }

    /// Make subsequent writes fail, to exercise the diagnostic path.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }
}

#[cfg(test)]
impl SnapshotStorage for MemoryStorage {
    fn read(&self) -> StoreResult<Option<String>> {
        Ok(self.slot.borrow().clone())
    }

    fn write(&mut self, data: &str) -> StoreResult<()> {
        if *self.fail_writes.borrow() {
            return Err(std::io::Error::other("storage unavailable").into());
        }
        *self.slot.borrow_mut() = Some(data.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Load the task collection, treating a missing, unreadable or corrupt
/// snapshot as an empty collection.
pub fn load_tasks(storage: &mut dyn SnapshotStorage) -> Vec<Task> {
    let raw = match storage.read() {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(location = %storage.describe(), error = %e, "error reading tasks, starting empty");
            keep_unreadable(storage);
            return Vec::new();
        }
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<Task>>(&raw) {
        Ok(tasks) => {
            tracing::debug!(count = tasks.len(), "loaded tasks");
            tasks
        }
        Err(e) => {
            tracing::warn!(location = %storage.describe(), error = %e, "error parsing tasks, starting empty");
            keep_unreadable(storage);
            Vec::new()
        }
    }
}

fn keep_unreadable(storage: &mut dyn SnapshotStorage) {
    match storage.preserve_corrupt() {
        Ok(Some(path)) => tracing::warn!(backup = %path.display(), "kept unreadable snapshot"),
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "failed to keep unreadable snapshot"),
    }
}

/// Serialize the collection and write it as the new snapshot.
pub fn save_tasks(storage: &mut dyn SnapshotStorage, tasks: &[Task]) -> StoreResult<()> {
    let data = serde_json::to_string_pretty(tasks)?;
    storage.write(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("smart_tasks_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let mut storage = MemoryStorage::new();
        assert!(load_tasks(&mut storage).is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_empty() {
        let mut storage = MemoryStorage::with_contents("{ not json");
        assert!(load_tasks(&mut storage).is_empty());
        let mut storage = MemoryStorage::with_contents(r#"{"tasks": []}"#);
        assert!(load_tasks(&mut storage).is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = scratch_dir();
        let mut storage = FileStorage::new(dir.join("tasks.json"));
        assert_eq!(storage.path(), dir.join("tasks.json").as_path());

        let tasks = vec![Task::from_draft(
            TaskDraft {
                title: "Write report".into(),
                ..Default::default()
            },
            1,
        )];
        save_tasks(&mut storage, &tasks).unwrap();
        assert!(!dir.join("tasks.json.tmp").exists());

        let loaded = load_tasks(&mut FileStorage::new(dir.join("tasks.json")));
        assert_eq!(loaded, tasks);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_file_is_preserved() {
        let dir = scratch_dir();
        fs::write(dir.join("tasks.json"), "[{broken").unwrap();

        let mut storage = FileStorage::new(dir.join("tasks.json"));
        assert!(load_tasks(&mut storage).is_empty());

        let backups: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("tasks.corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(backups[0].path()).unwrap(), "[{broken");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_non_utf8_file_survives_first_write() {
        let dir = scratch_dir();
        let original: &[u8] = b"[{\"id\":\"a\",\"title\":\"caf\xe9\"}]";
        fs::write(dir.join("tasks.json"), original).unwrap();

        let mut store = crate::store::TaskStore::open(
            Box::new(FileStorage::new(dir.join("tasks.json"))),
            Box::new(crate::celebrate::Quiet),
        );
        assert!(store.is_empty());
        store.create(TaskDraft {
            title: "new".into(),
            ..Default::default()
        });
        assert!(store.take_persist_error().is_none());

        let backups: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("tasks.corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read(backups[0].path()).unwrap(), original);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_memory_write_failure() {
        let mut storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        assert!(save_tasks(&mut storage, &[]).is_err());
        assert_eq!(storage.contents(), None);
    }
}
