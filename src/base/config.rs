//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, path::PathBuf, sync::Arc, time::Duration};

use serde::Deserialize;

use crate::base::replies;

use super::types::Res;

/// Default preference store backend.
fn default_store() -> StoreKind {
    StoreKind::File
}

/// Default path of the JSON preference file.
fn default_store_path() -> PathBuf {
    PathBuf::from("user_emojis.json")
}

/// Default database endpoint (embedded, on-disk).
fn default_db_endpoint() -> String {
    "surrealkv://auto_react.db".to_string()
}

fn default_db_namespace() -> String {
    "auto_react".to_string()
}

fn default_db_database() -> String {
    "bot".to_string()
}

/// Default cooldown between two reactions for the same user.
fn default_reaction_cooldown_secs() -> u64 {
    300
}

/// Default cooldown between two help replies for the same user.
fn default_help_cooldown_secs() -> u64 {
    120
}

/// Default cooldown between two rejection replies for the same user.
fn default_rejection_cooldown_secs() -> u64 {
    30
}

fn default_presence() -> String {
    replies::DEFAULT_PRESENCE.to_string()
}

/// Which durable backend holds user preferences.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process lifetime only.
    Memory,
    /// Whole-map JSON document, rewritten on every mutation.
    File,
    /// One SurrealDB record per user.
    Surreal,
}

/// Configuration for the auto-react application.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Discord bot token (`DISCORD_TOKEN`).
    pub discord_token: String,
    /// Preference store backend (`STORE`): `memory`, `file` or `surreal`.
    #[serde(default = "default_store")]
    pub store: StoreKind,
    /// Path of the JSON preference file (`STORE_PATH`).
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Database endpoint URL (`DB_ENDPOINT`), e.g. `surrealkv://auto_react.db`, `mem://` or `ws://host:8000`.
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Database username for remote endpoints (`DB_USERNAME`).
    #[serde(default)]
    pub db_username: Option<String>,
    /// Database password for remote endpoints (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: Option<String>,
    /// Seconds between two reactions to the same user (`REACTION_COOLDOWN_SECS`).
    #[serde(default = "default_reaction_cooldown_secs")]
    pub reaction_cooldown_secs: u64,
    /// Seconds between two help replies to the same user (`HELP_COOLDOWN_SECS`).
    #[serde(default = "default_help_cooldown_secs")]
    pub help_cooldown_secs: u64,
    /// Seconds between two rejection replies to the same user (`REJECTION_COOLDOWN_SECS`).
    #[serde(default = "default_rejection_cooldown_secs")]
    pub rejection_cooldown_secs: u64,
    /// Presence string shown by the bot (`PRESENCE`).
    #[serde(default = "default_presence")]
    pub presence: String,
    /// Optional attribution shown in the help text (`HELP_AUTHOR`).
    #[serde(default)]
    pub help_author: Option<String>,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            store: default_store(),
            store_path: default_store_path(),
            db_endpoint: default_db_endpoint(),
            db_namespace: default_db_namespace(),
            db_database: default_db_database(),
            db_username: None,
            db_password: None,
            reaction_cooldown_secs: default_reaction_cooldown_secs(),
            help_cooldown_secs: default_help_cooldown_secs(),
            rejection_cooldown_secs: default_rejection_cooldown_secs(),
            presence: default_presence(),
            help_author: None,
        }
    }
}

impl ConfigInner {
    pub fn reaction_cooldown(&self) -> Duration {
        Duration::from_secs(self.reaction_cooldown_secs)
    }

    pub fn help_cooldown(&self) -> Duration {
        Duration::from_secs(self.help_cooldown_secs)
    }

    pub fn rejection_cooldown(&self) -> Duration {
        Duration::from_secs(self.rejection_cooldown_secs)
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        // A `.env` file is optional.
        let _ = dotenvy::dotenv();

        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("AUTO_REACT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    fn validate(&self) -> Res<()> {
        if self.discord_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Discord token must not be empty."));
        }

        if self.reaction_cooldown_secs == 0 || self.help_cooldown_secs == 0 || self.rejection_cooldown_secs == 0 {
            return Err(anyhow::anyhow!("Cooldown windows must be at least one second."));
        }

        if self.store == StoreKind::File && self.store_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Store path must not be empty when using the file store."));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(inner: ConfigInner) -> Config {
        Config { inner: Arc::new(inner) }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.store, StoreKind::File);
        assert_eq!(config.reaction_cooldown(), Duration::from_secs(300));
        assert_eq!(config.help_cooldown(), Duration::from_secs(120));
        assert_eq!(config.rejection_cooldown(), Duration::from_secs(30));
        assert_eq!(config.presence, "PM '!AutoReact.help'");
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let config = config_with(ConfigInner::default());

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cooldown() {
        let config = config_with(ConfigInner {
            discord_token: "token".to_string(),
            help_cooldown_secs: 0,
            ..Default::default()
        });

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "discord_token = \"abc\"\nstore = \"memory\"\nreaction_cooldown_secs = 10\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.reaction_cooldown_secs, 10);
        assert_eq!(config.rejection_cooldown_secs, 30);
    }
}
