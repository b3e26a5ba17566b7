//! Entry point for every inbound message.

use tokio::task::JoinHandle;
use tracing::{Instrument, error, instrument};

use crate::{
    base::{
        config::Config,
        types::{InboundMessage, Void},
    },
    service::{chat::ChatClient, cooldown::Cooldowns, store::PreferenceStore},
};

use super::{
    command::{CommandRouter, Routed},
    reaction::ReactionEngine,
};

/// Dispatches inbound messages: commands go to the router, everything else
/// goes to the reaction engine.
///
/// This is trivially cloneable; the gateway clones it into every event.
#[derive(Clone)]
pub struct MessageHandler {
    router: CommandRouter,
    engine: ReactionEngine,
}

impl MessageHandler {
    pub fn new(config: &Config, store: PreferenceStore, cooldowns: Cooldowns, chat: ChatClient) -> Self {
        Self {
            router: CommandRouter::new(config, store.clone(), cooldowns.clone(), chat.clone()),
            engine: ReactionEngine::new(store, cooldowns, chat),
        }
    }

    /// Handles an inbound message on its own task.
    ///
    /// Errors are logged here and never reach the gateway loop.
    #[instrument(skip_all, fields(author = %message.author, channel = %message.channel))]
    pub fn handle(&self, message: InboundMessage) -> JoinHandle<()> {
        let handler = self.clone();

        tokio::spawn(
            async move {
                // Process the event.
                let result = handler.handle_internal(&message).await;

                // Log any errors.
                if let Err(err) = &result {
                    error!("Error while handling: {}", err);
                }
            }
            .in_current_span(),
        )
    }

    /// Route `message`, falling through to the reaction engine if it is not a command.
    pub async fn handle_internal(&self, message: &InboundMessage) -> Void {
        if self.router.route(message).await? == Routed::PassThrough {
            self.engine.handle(message).await;
        }

        Ok(())
    }
}
