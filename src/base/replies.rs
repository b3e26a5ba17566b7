//! User-facing reply text.

use unicode_segmentation::UnicodeSegmentation;

use crate::base::config::Config;

/// Prefix shared by every command.
pub const COMMAND_PREFIX: &str = "!AutoReact";

/// Most graphemes of a user's argument echoed back in a rejection.
pub const ECHO_LIMIT: usize = 32;

/// Presence shown next to the bot's name.
pub const DEFAULT_PRESENCE: &str = "PM '!AutoReact.help'";

/// Help text body (command list).
pub const HELP_BODY: &str = r#####"This bot will automatically react to any messages with a user's favorite emoji for those users who opt in. This will only work in servers where the bot is installed.

The commands are as follows:
'!AutoReact.disable' - removes the emoji preference, disabling the bot for the user
'!AutoReact.help' - prints a help message
'!AutoReact.set {emoji}' - set the preferred reaction emoji

Have a nice day!"#####;

/// Build the help text, with the configured author attribution if present.
pub fn help_text(config: &Config) -> String {
    match &config.help_author {
        Some(author) => format!("Hello! This is a Discord bot made by {author}. {HELP_BODY}"),
        None => format!("Hello! {HELP_BODY}"),
    }
}

/// One-line rejection for an invalid `set` argument.
pub fn rejection_text(offending: &str) -> String {
    if offending.is_empty() {
        "No emoji given. Usage: '!AutoReact.set {emoji}' with exactly one emoji.".to_string()
    } else {
        format!("'{}' is not a single emoji. Usage: '!AutoReact.set {{emoji}}'.", echo(offending))
    }
}

/// Quote user text on a single line, truncated to [`ECHO_LIMIT`] graphemes.
fn echo(text: &str) -> String {
    let mut graphemes = text.graphemes(true);

    let mut echoed: String = graphemes
        .by_ref()
        .take(ECHO_LIMIT)
        .map(|g| if g.chars().any(char::is_control) { " " } else { g })
        .collect();

    if graphemes.next().is_some() {
        echoed.push('…');
    }

    echoed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::base::config::ConfigInner;

    #[test]
    fn test_help_text_lists_commands() {
        let config = Config::default();
        let text = help_text(&config);

        assert!(text.contains("!AutoReact.set"));
        assert!(text.contains("!AutoReact.help"));
        assert!(text.contains("!AutoReact.disable"));
        assert!(!text.contains("made by"));
    }

    #[test]
    fn test_help_text_with_author() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                help_author: Some("Vawqer".to_string()),
                ..Default::default()
            }),
        };

        assert!(help_text(&config).contains("made by Vawqer"));
    }

    #[test]
    fn test_rejection_names_offending_text() {
        let text = rejection_text("xyz");

        assert!(text.contains("'xyz'"));
        assert!(!text.contains('\n'));
        assert!(rejection_text("").starts_with("No emoji given"));
    }

    #[test]
    fn test_rejection_is_one_line() {
        let text = rejection_text("🎉\nhello there\r\n\tagain");

        assert!(!text.contains(['\n', '\r', '\t']));
        assert!(text.contains("'🎉 hello there  again'"));
    }

    #[test]
    fn test_rejection_truncates_long_arguments() {
        let text = rejection_text(&"a".repeat(1985));

        assert!(text.contains(&format!("'{}…'", "a".repeat(ECHO_LIMIT))));
        assert!(text.chars().count() < 100);

        // Exactly at the limit is not truncated.
        let exact = "👍🏽".repeat(ECHO_LIMIT);
        assert!(rejection_text(&exact).contains(&format!("'{exact}'")));
    }
}
