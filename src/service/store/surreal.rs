//! SurrealDB preference store.
//!
//! One record per user in the `preference` table, keyed by the numeric user ID
//! (`preference:1234 = { user: 1234, emoji: "🎉" }`). Every record is read into
//! memory at startup so lookups never touch the database; mutations upsert or
//! delete a single record and update the cached copy only after the database
//! has accepted the change.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{
    RecordId, Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, instrument};

use crate::base::{config::Config, emoji::Emoji, error::StoreError, types::UserId};

use super::{GenericPreferenceStore, PreferenceStore};

/// Table holding one record per user.
const TABLE: &str = "preference";

/// Schema for the preference table.
const SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS preference SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS user ON preference TYPE int;
DEFINE FIELD IF NOT EXISTS emoji ON preference TYPE string;
"#;

impl PreferenceStore {
    /// Connects to the configured SurrealDB endpoint.
    pub async fn surreal(config: &Config) -> Result<Self, StoreError> {
        let credentials = config.db_username.as_deref().zip(config.db_password.as_deref());
        let store = SurrealPreferenceStore::connect(&config.db_endpoint, &config.db_namespace, &config.db_database, credentials).await?;

        Ok(Self::new(Arc::new(store)))
    }

    /// Creates a store on an in-memory SurrealDB instance.
    pub async fn surreal_memory() -> Result<Self, StoreError> {
        let store = SurrealPreferenceStore::connect("mem://", "auto_react", "bot", None).await?;

        Ok(Self::new(Arc::new(store)))
    }
}

/// A preference record in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferenceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    user: i64,
    emoji: String,
}

/// Preference store backed by SurrealDB.
///
/// Writes to the same user are serialized by a per-user lock; writes to
/// different users run concurrently.
pub struct SurrealPreferenceStore {
    db: Surreal<Any>,
    cache: RwLock<HashMap<UserId, Emoji>>,
    row_locks: RowLocks,
}

impl SurrealPreferenceStore {
    /// Connect, define the schema if needed, and load every record.
    #[instrument(name = "SurrealPreferenceStore::connect", skip(credentials))]
    pub async fn connect(endpoint: &str, namespace: &str, database: &str, credentials: Option<(&str, &str)>) -> Result<Self, StoreError> {
        let db = any::connect(endpoint).await?;

        if let Some((username, password)) = credentials {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(namespace).use_db(database).await?;

        // Define schemas.

        db.query(SCHEMA).await?.check()?;

        // Load existing preferences.

        let records: Vec<PreferenceRecord> = db.select(TABLE).await?;
        let cache = cache_from_records(records)?;

        info!("Database initialized successfully.");

        Ok(Self {
            db,
            cache: RwLock::new(cache),
            row_locks: RowLocks::default(),
        })
    }
}

/// Per-user write locks.
///
/// An entry lives only while some writer holds or awaits it.
#[derive(Default)]
struct RowLocks {
    locks: StdMutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl RowLocks {
    /// Acquire the write lock for `user`'s record.
    async fn lock(&self, user: UserId) -> RowGuard<'_> {
        let lock = self.entries().entry(user).or_default().clone();
        let guard = lock.lock_owned().await;

        RowGuard {
            locks: self,
            user,
            guard: Some(guard),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<UserId, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held for the duration of one record write.
struct RowGuard<'a> {
    locks: &'a RowLocks,
    user: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        let mut entries = self.locks.entries();

        // Unlock under the map lock so the count below only sees waiters.
        self.guard.take();

        if entries.get(&self.user).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            entries.remove(&self.user);
        }
    }
}

/// Validate loaded records; any bad row makes the whole load fail.
fn cache_from_records(records: Vec<PreferenceRecord>) -> Result<HashMap<UserId, Emoji>, StoreError> {
    let mut cache = HashMap::with_capacity(records.len());

    for record in records {
        let location = format!("{TABLE}:{}", record.user);
        let user = u64::try_from(record.user).map_err(|e| StoreError::malformed(location.clone(), e))?;
        let emoji = Emoji::parse(&record.emoji).map_err(|e| StoreError::malformed(location, e))?;

        cache.insert(UserId(user), emoji);
    }

    Ok(cache)
}

fn record_key(user: UserId) -> Result<i64, StoreError> {
    i64::try_from(user.0).map_err(|e| StoreError::malformed(format!("{TABLE}:{user}"), e))
}

#[async_trait]
impl GenericPreferenceStore for SurrealPreferenceStore {
    async fn get(&self, user: UserId) -> Option<Emoji> {
        self.cache.read().await.get(&user).cloned()
    }

    #[instrument(skip(self))]
    async fn set(&self, user: UserId, emoji: &Emoji) -> Result<(), StoreError> {
        let key = record_key(user)?;
        let _row = self.row_locks.lock(user).await;

        let record = PreferenceRecord {
            id: None,
            user: key,
            emoji: emoji.to_string(),
        };

        let _: Option<PreferenceRecord> = self.db.upsert((TABLE, key)).content(record).await?;

        self.cache.write().await.insert(user, emoji.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, user: UserId) -> Result<(), StoreError> {
        let key = record_key(user)?;
        let _row = self.row_locks.lock(user).await;

        // Deleting a missing record yields `None`, which is fine.
        let _: Option<PreferenceRecord> = self.db.delete((TABLE, key)).await?;

        self.cache.write().await.remove(&user);

        Ok(())
    }

    async fn len(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emoji(text: &str) -> Emoji {
        Emoji::parse(text).unwrap()
    }

    #[tokio::test]
    async fn test_row_lock_released_after_write() {
        let store = SurrealPreferenceStore::connect("mem://", "auto_react", "bot", None).await.unwrap();

        store.set(UserId(5), &emoji("🎉")).await.unwrap();
        store.delete(UserId(5)).await.unwrap();
        store.delete(UserId(6)).await.unwrap();

        assert!(store.row_locks.entries().is_empty());
    }

    #[tokio::test]
    async fn test_row_lock_kept_while_contended() {
        let locks = Arc::new(RowLocks::default());
        let holders = |locks: &RowLocks| locks.entries().get(&UserId(1)).map_or(0, Arc::strong_count);

        let first = locks.lock(UserId(1)).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _row = locks.lock(UserId(1)).await;
            })
        };

        // Map entry, the held guard, and the waiter.
        while holders(locks.as_ref()) < 3 {
            tokio::task::yield_now().await;
        }

        drop(first);
        assert_eq!(locks.entries().len(), 1);

        waiter.await.unwrap();
        assert!(locks.entries().is_empty());
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = PreferenceStore::surreal_memory().await.unwrap();

        assert_eq!(store.get(UserId(5)).await, None);

        store.set(UserId(5), &emoji("🎉")).await.unwrap();
        assert_eq!(store.get(UserId(5)).await, Some(emoji("🎉")));

        store.set(UserId(5), &emoji("🇯🇵")).await.unwrap();
        assert_eq!(store.get(UserId(5)).await, Some(emoji("🇯🇵")));
        assert_eq!(store.len().await, 1);

        store.delete(UserId(5)).await.unwrap();
        assert_eq!(store.get(UserId(5)).await, None);
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let store = PreferenceStore::surreal_memory().await.unwrap();

        assert!(store.delete(UserId(77)).await.is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_on_disk_and_row_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.db");
        let endpoint = format!("surrealkv://{}", path.display());

        let store = SurrealPreferenceStore::connect(&endpoint, "auto_react", "bot", None).await.unwrap();

        assert_eq!(store.len().await, 0);
        assert!(path.exists());

        store.set(UserId(11), &emoji("👍🏽")).await.unwrap();
        let records: Vec<PreferenceRecord> = store.db.select(TABLE).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user, 11);
        assert_eq!(records[0].emoji, "👍🏽");
    }

    #[test]
    fn test_malformed_records_fail_to_load() {
        let record = |user: i64, emoji: &str| PreferenceRecord {
            id: None,
            user,
            emoji: emoji.to_string(),
        };

        let cache = cache_from_records(vec![record(1, "🎉"), record(2, "👍🏽")]).unwrap();
        assert_eq!(cache.get(&UserId(2)), Some(&emoji("👍🏽")));

        assert!(matches!(cache_from_records(vec![record(3, "not an emoji")]), Err(StoreError::Malformed { .. })));
        assert!(matches!(cache_from_records(vec![record(-1, "🎉")]), Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn test_record_key_rejects_out_of_range() {
        assert_eq!(record_key(UserId(42)).unwrap(), 42);
        assert!(record_key(UserId(u64::MAX)).is_err());
    }
}
