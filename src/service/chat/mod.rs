pub mod discord;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{
    base::{
        emoji::Emoji,
        types::{ChannelId, MessageId, UserId, Void},
    },
    interaction::message::MessageHandler,
};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the gateway side effects the bot needs. Both calls may
/// fail (e.g. the platform rejects the emoji or the user blocks DMs); callers
/// log those failures rather than propagating them.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Start the chat client listener.
    ///
    /// This connects to the gateway and dispatches inbound messages to
    /// `handler`. It returns when the connection is shut down.
    async fn start(&self, handler: MessageHandler) -> Void;

    /// Send a private text message to a user.
    async fn send_private_message(&self, user: UserId, text: &str) -> Void;

    /// React to a message with an emoji.
    async fn react_to_message(&self, channel: ChannelId, message: MessageId, emoji: &Emoji) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}

// Mocks.
