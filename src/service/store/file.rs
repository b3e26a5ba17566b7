//! JSON-file preference store.
//!
//! The whole map is kept in memory and rewritten to disk on every mutation as
//! a JSON object keyed by user ID (`{"1234": "🎉"}`). Writes go to a sibling
//! temporary file which is synced and then renamed over the original, and the
//! directory is synced after the rename. A crash never leaves a half-written
//! document behind or loses an acknowledged write.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info, instrument};

use crate::base::{emoji::Emoji, error::StoreError, types::UserId};

use super::{GenericPreferenceStore, PreferenceStore};

type Preferences = BTreeMap<UserId, Emoji>;

impl PreferenceStore {
    /// Opens (or bootstraps) the JSON preference file at `path`.
    pub async fn file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = FilePreferenceStore::open(path.as_ref()).await?;
        Ok(Self::new(Arc::new(store)))
    }
}

/// Preference store backed by a single JSON document.
///
/// All writes are serialized behind one lock.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    preferences: Mutex<Preferences>,
}

impl FilePreferenceStore {
    /// Reads the document at `path`, creating an empty one if it does not exist.
    #[instrument(name = "FilePreferenceStore::open", skip_all, fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let preferences = match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice::<Preferences>(&bytes).map_err(|e| StoreError::malformed(path.display().to_string(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Preference file not found, creating an empty one.");

                let empty = Preferences::new();
                write_document(path, &empty).await?;
                empty
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        Ok(Self {
            path: path.to_path_buf(),
            preferences: Mutex::new(preferences),
        })
    }
}

#[async_trait]
impl GenericPreferenceStore for FilePreferenceStore {
    async fn get(&self, user: UserId) -> Option<Emoji> {
        self.preferences.lock().await.get(&user).cloned()
    }

    async fn set(&self, user: UserId, emoji: &Emoji) -> Result<(), StoreError> {
        let mut preferences = self.preferences.lock().await;
        let previous = preferences.insert(user, emoji.clone());

        if let Err(e) = write_document(&self.path, &preferences).await {
            // Keep memory in step with what is on disk.
            match previous {
                Some(previous) => preferences.insert(user, previous),
                None => preferences.remove(&user),
            };

            return Err(e);
        }

        Ok(())
    }

    async fn delete(&self, user: UserId) -> Result<(), StoreError> {
        let mut preferences = self.preferences.lock().await;

        let Some(previous) = preferences.remove(&user) else {
            debug!("No preference to delete for {}.", user);
            return Ok(());
        };

        if let Err(e) = write_document(&self.path, &preferences).await {
            preferences.insert(user, previous);
            return Err(e);
        }

        Ok(())
    }

    async fn len(&self) -> usize {
        self.preferences.lock().await.len()
    }
}

/// Atomically replace the document at `path` with `preferences`.
///
/// Returns once both the new contents and the rename are on disk.
async fn write_document(path: &Path, preferences: &Preferences) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(preferences)?;
    let temp = temp_path(path);
    let parent = document_dir(path);

    fs::create_dir_all(parent).await.map_err(|e| StoreError::io(parent, e))?;

    if let Err(e) = replace_file(path, &temp, &bytes).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }

    sync_dir(parent).await
}

/// Write `bytes` to `temp`, sync it, and rename it over `path`.
async fn replace_file(path: &Path, temp: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::File::create(temp).await.map_err(|e| StoreError::io(temp, e))?;
    file.write_all(bytes).await.map_err(|e| StoreError::io(temp, e))?;
    file.sync_all().await.map_err(|e| StoreError::io(temp, e))?;
    drop(file);

    fs::rename(temp, path).await.map_err(|e| StoreError::io(path, e))
}

/// Persist the directory entry created by a rename.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    let handle = fs::File::open(dir).await.map_err(|e| StoreError::io(dir, e))?;
    handle.sync_all().await.map_err(|e| StoreError::io(dir, e))
}

// Directories cannot be opened for syncing on other platforms.
#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Directory holding `path`; a bare file name lives in the working directory.
fn document_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emoji(text: &str) -> Emoji {
        Emoji::parse(text).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_creates_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_emojis.json");

        let store = PreferenceStore::file(&path).await.unwrap();

        assert_eq!(store.len().await, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

        // Loading again from the bootstrapped file succeeds.
        let store = PreferenceStore::file(&path).await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_mutations_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_emojis.json");

        let store = PreferenceStore::file(&path).await.unwrap();
        store.set(UserId(1), &emoji("🎉")).await.unwrap();
        store.set(UserId(2), &emoji("👍🏽")).await.unwrap();
        store.delete(UserId(1)).await.unwrap();

        let reloaded = PreferenceStore::file(&path).await.unwrap();
        assert_eq!(reloaded.get(UserId(1)).await, None);
        assert_eq!(reloaded.get(UserId(2)).await, Some(emoji("👍🏽")));
    }

    #[tokio::test]
    async fn test_document_uses_string_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_emojis.json");

        let store = PreferenceStore::file(&path).await.unwrap();
        store.set(UserId(1234), &emoji("🎉")).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"1234\":\"🎉\"}");
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_emojis.json");

        let store = PreferenceStore::file(&path).await.unwrap();

        assert!(store.delete(UserId(9)).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_document_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_emojis.json");

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(PreferenceStore::file(&path).await, Err(StoreError::Malformed { .. })));

        std::fs::write(&path, "{\"1\": \"not an emoji\"}").unwrap();
        assert!(matches!(PreferenceStore::file(&path).await, Err(StoreError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_emojis.json");

        let store = PreferenceStore::file(&path).await.unwrap();

        // Block the temporary file path with a directory so the write fails.
        std::fs::create_dir(temp_path(&path)).unwrap();

        assert!(store.set(UserId(1), &emoji("🎉")).await.is_err());
        assert_eq!(store.get(UserId(1)).await, None);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_emojis.json");

        let store = PreferenceStore::file(&path).await.unwrap();

        // Replace the document with a non-empty directory so the rename fails.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "").unwrap();

        assert!(matches!(store.set(UserId(1), &emoji("🎉")).await, Err(StoreError::Io { .. })));
        assert_eq!(store.get(UserId(1)).await, None);
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_successful_write_leaves_only_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_emojis.json");

        let store = PreferenceStore::file(&path).await.unwrap();
        store.set(UserId(1), &emoji("🎉")).await.unwrap();
        store.delete(UserId(1)).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("user_emojis.json")]);
    }

    #[test]
    fn test_document_dir() {
        assert_eq!(document_dir(Path::new("user_emojis.json")), Path::new("."));
        assert_eq!(document_dir(Path::new("data/user_emojis.json")), Path::new("data"));
    }
}
