//! Command classification and handling.
//!
//! Users manage their preference by messaging the bot privately:
//! - `!AutoReact.set {emoji}`
//! - `!AutoReact.help`
//! - `!AutoReact.disable`
//!
//! [`Command::parse`] turns a message into a [`Command`]; [`CommandRouter::route`]
//! acts on it. Anything that is not a command is handed back to the caller so it
//! can be reacted to.

use std::time::Duration;

use tracing::{debug, error, info, instrument};

use crate::{
    base::{
        config::Config,
        emoji::Emoji,
        replies::{self, COMMAND_PREFIX},
        types::{ChannelKind, InboundMessage, Res, UserId},
    },
    service::{
        chat::ChatClient,
        cooldown::{CooldownTracker, Cooldowns},
        store::PreferenceStore,
    },
};

const SET: &str = ".set";
const HELP: &str = ".help";
const DISABLE: &str = ".disable";

/// Classification of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `!AutoReact.set {emoji}`; carries the trimmed, unvalidated argument.
    Set(&'a str),
    /// `!AutoReact.help`.
    Help,
    /// `!AutoReact.disable`.
    Disable,
    /// Starts with the command prefix on a private channel but matches no command.
    Unrecognized(&'a str),
    /// Private message without the command prefix.
    NotACommand,
    /// Posted outside a private channel; never a command.
    NotPrivate,
}

impl<'a> Command<'a> {
    /// Classify `text` received on a channel of the given kind.
    ///
    /// Matching is case-sensitive and by prefix.
    pub fn parse(text: &'a str, kind: ChannelKind) -> Self {
        if kind != ChannelKind::Private {
            return Self::NotPrivate;
        }

        let Some(rest) = text.strip_prefix(COMMAND_PREFIX) else {
            return Self::NotACommand;
        };

        if let Some(argument) = rest.strip_prefix(SET)
            && (argument.is_empty() || argument.starts_with(char::is_whitespace))
        {
            return Self::Set(argument.trim());
        }

        if rest.starts_with(HELP) {
            return Self::Help;
        }

        if rest.starts_with(DISABLE) {
            return Self::Disable;
        }

        Self::Unrecognized(text)
    }
}

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// The message was a command (or an unrecognized one) and has been consumed.
    Handled,
    /// The message is ordinary chatter and should go to the reaction engine.
    PassThrough,
}

/// Dispatches private-channel commands.
///
/// This is trivially cloneable and holds no state of its own.
#[derive(Clone)]
pub struct CommandRouter {
    store: PreferenceStore,
    help: CooldownTracker,
    help_window: Duration,
    rejection: CooldownTracker,
    rejection_window: Duration,
    help_text: String,
    chat: ChatClient,
}

impl CommandRouter {
    pub fn new(config: &Config, store: PreferenceStore, cooldowns: Cooldowns, chat: ChatClient) -> Self {
        Self {
            store,
            help: cooldowns.help,
            help_window: cooldowns.help_window,
            rejection: cooldowns.rejection,
            rejection_window: cooldowns.rejection_window,
            help_text: replies::help_text(config),
            chat,
        }
    }

    /// Classify and, if it is a command, handle `message`.
    ///
    /// Store failures are returned to the caller; reply failures are logged.
    #[instrument(skip_all, fields(author = %message.author))]
    pub async fn route(&self, message: &InboundMessage) -> Res<Routed> {
        match Command::parse(&message.text, message.kind) {
            Command::Set(argument) => self.set(message.author, argument).await?,
            Command::Help => self.help(message.author).await,
            Command::Disable => self.disable(message.author).await?,
            Command::Unrecognized(text) => debug!("Ignoring unrecognized command `{}`.", text),
            Command::NotACommand | Command::NotPrivate => return Ok(Routed::PassThrough),
        }

        Ok(Routed::Handled)
    }

    async fn set(&self, user: UserId, argument: &str) -> Res<()> {
        let emoji = match Emoji::parse(argument) {
            Ok(emoji) => emoji,
            Err(e) => {
                info!("Rejected preference from {}: {}.", user, e);

                let Some(permit) = self.rejection.try_acquire(user, self.rejection_window) else {
                    debug!("Rejection reply to {} suppressed by cooldown.", user);
                    return Ok(());
                };

                if self.reply(user, &replies::rejection_text(argument)).await {
                    permit.commit();
                }

                return Ok(());
            }
        };

        self.store.set(user, &emoji).await?;

        info!("Set preference for {} to {}.", user, emoji);

        Ok(())
    }

    async fn help(&self, user: UserId) {
        let Some(permit) = self.help.try_acquire(user, self.help_window) else {
            debug!("Help reply to {} suppressed by cooldown.", user);
            return;
        };

        if self.reply(user, &self.help_text).await {
            permit.commit();
        }
    }

    async fn disable(&self, user: UserId) -> Res<()> {
        self.store.delete(user).await?;

        info!("Disabled reactions for {}.", user);

        Ok(())
    }

    /// Send a private reply; failures are logged and reported as `false`.
    async fn reply(&self, user: UserId, text: &str) -> bool {
        match self.chat.send_private_message(user, text).await {
            Ok(()) => true,
            Err(err) => {
                error!(user = %user, error = %err, "Failed to send private reply.");
                false
            }
        }
    }
}

// Tests.
