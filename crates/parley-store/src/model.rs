// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to a session whose first message has no usable text.
pub const DEFAULT_TITLE: &str = "New chat";

/// Longest title, in characters, derived from a first message.
pub const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One chat turn.  Never modified after it is appended.
///
/// The serialized field names (`role`, `content`, `createdAt`) are a stored
/// format and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted conversation thread.
///
/// `messages` is append-only, so index order is chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(id: String, title: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Title for display; empty titles show as `untitled`.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "untitled"
        } else {
            &self.title
        }
    }

    /// Case-insensitive substring match against the title or any message.
    /// `needle` must already be lowercased.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .messages
                .iter()
                .any(|m| m.content.to_lowercase().contains(needle))
    }
}

/// Derive a session title from the first message of a conversation.
///
/// Whitespace runs collapse to one space, the result is cut to
/// [`TITLE_MAX_CHARS`] characters, and an empty result becomes
/// [`DEFAULT_TITLE`].
pub fn derive_title(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut: String = collapsed.chars().take(TITLE_MAX_CHARS).collect();
    let cut = cut.trim_end();
    if cut.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        cut.to_string()
    }
}
