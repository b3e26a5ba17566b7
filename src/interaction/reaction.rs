//! Reacting to users' messages with their preferred emoji.

use std::time::Duration;

use tracing::{debug, error, info, instrument};

use crate::{
    base::{emoji::Emoji, types::InboundMessage},
    service::{
        chat::ChatClient,
        cooldown::{CooldownTracker, Cooldowns},
        store::PreferenceStore,
    },
};

/// What happened to a message handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// The author reacted too recently.
    CoolingDown,
    /// The author has no preference.
    NoPreference,
    /// The reaction was attached.
    Reacted(Emoji),
    /// The platform rejected the reaction; already logged.
    Failed,
}

/// Reacts to messages, at most once per author per window.
#[derive(Clone)]
pub struct ReactionEngine {
    store: PreferenceStore,
    cooldown: CooldownTracker,
    window: Duration,
    chat: ChatClient,
}

impl ReactionEngine {
    pub fn new(store: PreferenceStore, cooldowns: Cooldowns, chat: ChatClient) -> Self {
        Self {
            store,
            cooldown: cooldowns.reaction,
            window: cooldowns.reaction_window,
            chat,
        }
    }

    /// React to `message` with its author's emoji, if any.
    ///
    /// The cooldown slot is reserved before the reaction is attempted, so two
    /// concurrent messages from one author cannot both get through. It is only
    /// kept if the reaction succeeds. Failures never propagate.
    #[instrument(skip_all, fields(author = %message.author, channel = %message.channel))]
    pub async fn handle(&self, message: &InboundMessage) -> ReactionOutcome {
        let Some(permit) = self.cooldown.try_acquire(message.author, self.window) else {
            debug!("Skipping reaction, author is cooling down.");
            return ReactionOutcome::CoolingDown;
        };

        let Some(emoji) = self.store.get(message.author).await else {
            return ReactionOutcome::NoPreference;
        };

        match self.chat.react_to_message(message.channel, message.id, &emoji).await {
            Ok(()) => {
                permit.commit();
                info!("Reacted to {}'s message with {}.", message.author, emoji);
                ReactionOutcome::Reacted(emoji)
            }
            Err(err) => {
                error!(
                    author = %message.author,
                    channel = %message.channel,
                    message_id = %message.id,
                    emoji = %emoji,
                    error = %err,
                    "Failed to react to message."
                );
                ReactionOutcome::Failed
            }
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        base::{
            config::Config,
            types::{ChannelId, ChannelKind, MessageId, UserId},
        },
        service::{chat::mock::MockChat, cooldown::ManualClock},
    };

    fn message(author: u64) -> InboundMessage {
        InboundMessage {
            id: MessageId(500),
            author: UserId(author),
            channel: ChannelId(50),
            kind: ChannelKind::Shared,
            text: "hello".to_string(),
        }
    }

    fn emoji(text: &str) -> Emoji {
        Emoji::parse(text).unwrap()
    }

    fn engine(chat: MockChat) -> (Arc<ManualClock>, PreferenceStore, ReactionEngine) {
        let clock = Arc::new(ManualClock::default());
        let store = PreferenceStore::memory();
        let cooldowns = Cooldowns::with_clock(&Config::default(), clock.clone());
        let engine = ReactionEngine::new(store.clone(), cooldowns, ChatClient::new(Arc::new(chat)));

        (clock, store, engine)
    }

    #[tokio::test]
    async fn test_no_preference_does_nothing() {
        let mut chat = MockChat::new();
        chat.expect_react_to_message().never();

        let (_, _, engine) = engine(chat);

        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::NoPreference);
    }

    #[tokio::test]
    async fn test_reacts_then_cools_down() {
        let mut chat = MockChat::new();
        chat.expect_react_to_message()
            .withf(|channel, message, emoji| *channel == ChannelId(50) && *message == MessageId(500) && emoji.as_str() == "🎉")
            .times(2)
            .returning(|_, _, _| Ok(()));

        let (clock, store, engine) = engine(chat);
        store.set(UserId(1), &emoji("🎉")).await.unwrap();

        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::Reacted(emoji("🎉")));
        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::CoolingDown);

        clock.advance(Duration::from_secs(299));
        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::CoolingDown);

        clock.advance(Duration::from_secs(1));
        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::Reacted(emoji("🎉")));
    }

    #[tokio::test]
    async fn test_setting_preference_after_message_is_not_blocked() {
        let mut chat = MockChat::new();
        chat.expect_react_to_message().times(1).returning(|_, _, _| Ok(()));

        let (_, store, engine) = engine(chat);

        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::NoPreference);

        store.set(UserId(1), &emoji("🎉")).await.unwrap();
        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::Reacted(emoji("🎉")));
    }

    #[tokio::test]
    async fn test_failure_is_contained_and_not_recorded() {
        let mut chat = MockChat::new();
        chat.expect_react_to_message().times(2).returning(|_, _, _| Err(anyhow::anyhow!("Unknown Emoji")));

        let (_, store, engine) = engine(chat);
        store.set(UserId(1), &emoji("🎉")).await.unwrap();

        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::Failed);
        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_messages_react_once() {
        let mut chat = MockChat::new();
        chat.expect_react_to_message().times(1).returning(|_, _, _| Ok(()));

        let (_, store, engine) = engine(chat);
        store.set(UserId(1), &emoji("🎉")).await.unwrap();

        let first = message(1);
        let second = message(1);
        let (a, b) = tokio::join!(engine.handle(&first), engine.handle(&second));

        let reacted = [a, b].iter().filter(|o| matches!(o, ReactionOutcome::Reacted(_))).count();
        assert_eq!(reacted, 1);
    }

    #[tokio::test]
    async fn test_users_cool_down_independently() {
        let mut chat = MockChat::new();
        chat.expect_react_to_message().times(2).returning(|_, _, _| Ok(()));

        let (_, store, engine) = engine(chat);
        store.set(UserId(1), &emoji("🎉")).await.unwrap();
        store.set(UserId(2), &emoji("👍🏽")).await.unwrap();

        assert_eq!(engine.handle(&message(1)).await, ReactionOutcome::Reacted(emoji("🎉")));
        assert_eq!(engine.handle(&message(2)).await, ReactionOutcome::Reacted(emoji("👍🏽")));
    }
}
