//! Runtime services and shared state for auto-react.

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::message::MessageHandler,
    service::{chat::ChatClient, cooldown::Cooldowns, store::PreferenceStore},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the preference store, cooldowns, chat client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The preference store instance.
    pub store: PreferenceStore,
    /// The per-user cooldown trackers.
    pub cooldowns: Cooldowns,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    ///
    /// Fails if the preference store cannot be loaded.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the preference store.
        let store = PreferenceStore::load(&config).await?;

        // Initialize the cooldowns.
        let cooldowns = Cooldowns::new(&config);

        // Initialize the discord client.
        let chat = ChatClient::discord(&config)?;

        Ok(Self { config, store, cooldowns, chat })
    }

    /// Build the message handler over this runtime's services.
    pub fn handler(&self) -> MessageHandler {
        MessageHandler::new(&self.config, self.store.clone(), self.cooldowns.clone(), self.chat.clone())
    }

    /// Connect to the gateway and dispatch messages until shutdown.
    pub async fn start(&self) -> Void {
        self.chat.start(self.handler()).await
    }
}
