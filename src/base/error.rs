//! Typed errors for the preference store and emoji validation.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure to read or persist preferences.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure on the durable preference file.
    #[error("I/O error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Durable state exists but cannot be interpreted.
    #[error("Malformed preference data in `{location}`: {reason}")]
    Malformed { location: String, reason: String },

    /// The preference database rejected a query.
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),

    /// The preference map could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub fn malformed(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Rejected `set` argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no emoji was given")]
    Empty,

    #[error("`{0}` is not a single emoji")]
    NotSingleEmoji(String),
}
