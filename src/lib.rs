//! Library root for `auto-react`.
//!
//! Auto-react is a Discord bot designed to:
//! - Remember one favorite emoji per user
//! - React to that user's messages with it, at most once per cooldown window
//! - Let users manage their emoji through private-message commands
//!
//! The bot integrates with Discord for chat and keeps preferences in memory,
//! in a JSON file, or in SurrealDB. The architecture is built around
//! extensible traits that allow for different implementations of each service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the auto-react runtime:
/// - Loads (or bootstraps) the preference store
/// - Creates the runtime context with the store, cooldowns, and chat client
/// - Starts the gateway connection for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting auto-react ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
