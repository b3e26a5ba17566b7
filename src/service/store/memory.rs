//! In-memory preference store.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::base::{emoji::Emoji, error::StoreError, types::UserId};

use super::{GenericPreferenceStore, PreferenceStore};

impl PreferenceStore {
    /// Creates a store that lives as long as the process.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryPreferenceStore::default()))
    }
}

/// Process-lifetime preference map.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    preferences: RwLock<HashMap<UserId, Emoji>>,
}

#[async_trait]
impl GenericPreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user: UserId) -> Option<Emoji> {
        self.preferences.read().await.get(&user).cloned()
    }

    async fn set(&self, user: UserId, emoji: &Emoji) -> Result<(), StoreError> {
        self.preferences.write().await.insert(user, emoji.clone());
        Ok(())
    }

    async fn delete(&self, user: UserId) -> Result<(), StoreError> {
        self.preferences.write().await.remove(&user);
        Ok(())
    }

    async fn len(&self) -> usize {
        self.preferences.read().await.len()
    }
}
