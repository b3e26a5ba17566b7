//! Discord gateway integration for auto-react.
//!
//! This module provides functionality for interacting with Discord:
//! - Receiving messages and connection lifecycle events
//! - Sending private replies and reactions
//!
//! It implements the `GenericChatClient` trait on top of serenity.

use async_trait::async_trait;
use serenity::all::{
    ActivityData, ChannelId as DiscordChannelId, Client, ConnectionStage, Context, CreateMessage, EventHandler, GatewayIntents, Http, Message,
    MessageId as DiscordMessageId, ReactionType, Ready, ResumedEvent, ShardStageUpdateEvent, UserId as DiscordUserId,
};
use tracing::{Instrument, debug, info, instrument, warn};

use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    base::{
        config::Config,
        emoji::Emoji,
        types::{ChannelId, ChannelKind, InboundMessage, MessageId, Res, UserId, Void},
    },
    interaction::message::MessageHandler,
};

use super::{ChatClient, GenericChatClient};

// Extra methods on `ChatClient` applied by the discord implementation.

impl ChatClient {
    /// Creates a new Discord chat client.
    pub fn discord(config: &Config) -> Res<Self> {
        let client = DiscordChatClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<DiscordChatClient> for ChatClient {
    fn from(client: DiscordChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// Gateway event handler.
struct DiscordHandler {
    handler: MessageHandler,
    presence: String,
}

/// Discord client implementation.
///
/// Clones share one HTTP client. Once the gateway is up it is the gateway's
/// own client, so replies and reactions share its rate limits.
#[derive(Clone)]
struct DiscordChatClient {
    token: String,
    http: Arc<RwLock<Arc<Http>>>,
    presence: String,
}

impl DiscordChatClient {
    /// Create a new Discord chat client.
    #[instrument(name = "DiscordChatClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let token = config.discord_token.trim().to_string();

        if token.is_empty() {
            return Err(anyhow::anyhow!("Discord token must not be empty."));
        }

        let http = Arc::new(RwLock::new(Arc::new(Http::new(&token))));

        Ok(Self {
            token,
            http,
            presence: config.presence.clone(),
        })
    }

    fn http(&self) -> Arc<Http> {
        self.http.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn use_http(&self, http: Arc<Http>) {
        *self.http.write().unwrap_or_else(PoisonError::into_inner) = http;
    }
}

#[async_trait]
impl GenericChatClient for DiscordChatClient {
    async fn start(&self, handler: MessageHandler) -> Void {
        let handler = DiscordHandler {
            handler,
            presence: self.presence.clone(),
        };

        // Connect to the gateway.

        let intents = GatewayIntents::GUILD_MESSAGES | GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

        let mut client = Client::builder(&self.token, intents).event_handler(handler).await?;

        self.use_http(client.http.clone());

        // Stop every shard on Ctrl-C, which lets `start` return.

        let shard_manager = client.shard_manager.clone();
        tokio::spawn(shutdown_on(tokio::signal::ctrl_c(), async move { shard_manager.shutdown_all().await }).in_current_span());

        client.start().await?;

        info!("Gateway connection closed.");

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_private_message(&self, user: UserId, text: &str) -> Void {
        let builder = CreateMessage::new().content(text);

        let _ = DiscordUserId::new(user.0)
            .direct_message(self.http(), builder)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send private message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn react_to_message(&self, channel: ChannelId, message: MessageId, emoji: &Emoji) -> Void {
        let reaction = ReactionType::Unicode(emoji.to_string());

        self.http()
            .create_reaction(DiscordChannelId::new(channel.0), DiscordMessageId::new(message.0), &reaction)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to react to message: {}", e))?;

        Ok(())
    }
}

/// Waits for `signal`, then runs `shutdown`.
async fn shutdown_on<S, F>(signal: S, shutdown: F)
where
    S: Future<Output = std::io::Result<()>>,
    F: Future<Output = ()>,
{
    match signal.await {
        Ok(()) => {
            info!("Shutdown requested, stopping shards ...");
            shutdown.await;
        }
        Err(e) => warn!("Unable to listen for the shutdown signal: {}", e),
    }
}

/// Convert a serenity message into the bot's inbound message.
fn inbound_message(message: &Message) -> InboundMessage {
    // Guild-less messages arrive on a one-to-one DM channel.
    let kind = if message.guild_id.is_none() { ChannelKind::Private } else { ChannelKind::Shared };

    InboundMessage {
        id: MessageId(message.id.get()),
        author: UserId(message.author.id.get()),
        channel: ChannelId(message.channel_id.get()),
        kind,
        text: message.content.clone(),
    }
}

// Gateway callbacks.

#[async_trait]
impl EventHandler for DiscordHandler {
    /// Sets the presence once connected.
    async fn ready(&self, ctx: Context, ready: Ready) {
        ctx.set_activity(Some(ActivityData::playing(self.presence.clone())));

        info!("{} has connected to Discord!", ready.user.tag());
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        info!("Gateway session resumed.");
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        if matches!(event.new, ConnectionStage::Disconnected) {
            warn!("Shard {:?} disconnected from the gateway.", event.shard_id);
        } else {
            debug!("Shard {:?} moved from {:?} to {:?}.", event.shard_id, event.old, event.new);
        }
    }

    /// Handles every message the bot can see.
    async fn message(&self, _ctx: Context, message: Message) {
        // Never react to bots, including ourselves.
        if message.author.bot {
            return;
        }

        self.handler.handle(inbound_message(&message));
    }
}
