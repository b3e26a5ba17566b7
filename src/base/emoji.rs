//! Emoji validation.
//!
//! A preference must be exactly one user-perceived character that is an emoji.
//! Counting is done on extended grapheme clusters, so composed sequences
//! (skin tones, flags, ZWJ families, keycaps) count as one.

use std::{fmt, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use super::error::ValidationError;

/// Emoji presentation selector.
const VS16: char = '\u{FE0F}';

/// Returns `true` if `text` is exactly one well-formed emoji glyph.
pub fn is_single_emoji(text: &str) -> bool {
    let mut graphemes = text.graphemes(true);

    let (Some(grapheme), None) = (graphemes.next(), graphemes.next()) else {
        return false;
    };

    is_emoji_grapheme(grapheme)
}

fn is_emoji_grapheme(grapheme: &str) -> bool {
    if emojis::get(grapheme).is_some() {
        return true;
    }

    // Users often type the unqualified form (e.g. `❤` without the selector).
    if !grapheme.ends_with(VS16) && emojis::get(&format!("{grapheme}{VS16}")).is_some() {
        return true;
    }

    grapheme.contains(VS16) && emojis::get(&grapheme.replace(VS16, "")).is_some()
}

/// A validated single-emoji preference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Emoji(String);

impl Emoji {
    /// Validates `text` as exactly one emoji.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        if text.is_empty() {
            return Err(ValidationError::Empty);
        }

        if !is_single_emoji(text) {
            return Err(ValidationError::NotSingleEmoji(text.to_string()));
        }

        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Emoji {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Emoji {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Emoji {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Emoji> for String {
    fn from(value: Emoji) -> Self {
        value.0
    }
}

// Tests.
