//! Chat posts
//!
//! Validation and encoding of user messages before they reach the hub.
//! Both fields are HTML-escaped so browsers can render the payload as-is.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MIN_NICK_LEN: usize = 2;
const MAX_NICK_LEN: usize = 13;
const MIN_MESSAGE_LEN: usize = 2;
const MAX_MESSAGE_LEN: usize = 199;

/// Normalize a nickname taken from a room URL
///
/// Too short becomes empty; too long is cut to 12 chars plus `...`.
pub fn normalize_nick(raw: &str) -> String {
    let len = raw.chars().count();
    if len < MIN_NICK_LEN {
        String::new()
    } else if len > MAX_NICK_LEN {
        let mut nick: String = raw.chars().take(MAX_NICK_LEN - 1).collect();
        nick.push_str("...");
        nick
    } else {
        raw.to_owned()
    }
}

/// Escape the five HTML-special characters
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A validated, escaped chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPost {
    pub nick: String,
    pub message: String,
}

impl ChatPost {
    /// Validate and escape a raw post
    ///
    /// The message is trimmed first. Lengths are counted in chars.
    pub fn new(nick: &str, message: &str) -> Result<Self> {
        let message = message.trim();
        let message_len = message.chars().count();
        let nick_len = nick.chars().count();

        let valid_message = (MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&message_len);
        let valid_nick = (MIN_NICK_LEN..=MAX_NICK_LEN).contains(&nick_len);
        if !valid_message || !valid_nick {
            return Err(Error::InvalidPost(
                "the message or nickname is too long".into(),
            ));
        }

        Ok(Self {
            nick: escape_html(nick),
            message: escape_html(message),
        })
    }

    /// Encode as a JSON object
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
