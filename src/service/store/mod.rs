//! User emoji preferences.
//!
//! A [`PreferenceStore`] maps each user to at most one emoji. Three backends
//! share the same contract and differ only in durability and I/O granularity:
//! - `memory`: process lifetime only.
//! - `file`: a JSON document rewritten on every mutation.
//! - `surreal`: one SurrealDB record per user, upserted or deleted in place.

pub mod file;
pub mod memory;
pub mod surreal;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::base::{
    config::{Config, StoreKind},
    emoji::Emoji,
    error::StoreError,
    types::UserId,
};

// Traits.

/// Generic preference store trait that backends must implement.
///
/// Reads never fail: every backend serves `get` from memory, and mutations are
/// durable before they return `Ok`.
#[async_trait]
pub trait GenericPreferenceStore: Send + Sync + 'static {
    /// Gets the user's emoji, if any.
    async fn get(&self, user: UserId) -> Option<Emoji>;

    /// Sets (or overwrites) the user's emoji.
    ///
    /// Returns only once the change is durable for the backend. On failure the
    /// in-memory view is left unchanged.
    async fn set(&self, user: UserId, emoji: &Emoji) -> Result<(), StoreError>;

    /// Removes the user's emoji.
    ///
    /// Removing a user without a preference is a successful no-op.
    async fn delete(&self, user: UserId) -> Result<(), StoreError>;

    /// Number of users with a preference.
    async fn len(&self) -> usize;
}

// Structs.

/// Preference store for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct PreferenceStore {
    inner: Arc<dyn GenericPreferenceStore>,
}

impl Deref for PreferenceStore {
    type Target = dyn GenericPreferenceStore;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl PreferenceStore {
    pub fn new(inner: Arc<dyn GenericPreferenceStore>) -> Self {
        Self { inner }
    }

    /// Load the configured backend from durable storage.
    ///
    /// Missing storage is bootstrapped empty; malformed storage is an error.
    #[instrument(name = "PreferenceStore::load", skip_all, fields(store = ?config.store))]
    pub async fn load(config: &Config) -> Result<Self, StoreError> {
        let store = match config.store {
            StoreKind::Memory => Self::memory(),
            StoreKind::File => Self::file(&config.store_path).await?,
            StoreKind::Surreal => Self::surreal(config).await?,
        };

        info!("Loaded {} preferences.", store.len().await);

        Ok(store)
    }
}
