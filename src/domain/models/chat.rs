#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use chrono::DateTime;
use chrono::Utc;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::timestamp;
use super::Author;
use super::ChatMessage;

pub const DEFAULT_TITLE: &str = "New Chat";
const TITLE_MAX_CHARS: usize = 30;

fn default_title() -> String {
    return DEFAULT_TITLE.to_string();
}

/// Title shown for a chat whose first user message is `text`.
pub fn derive_title(text: &str) -> String {
    let first_line = text.trim().lines().next().unwrap_or_default().trim();
    if first_line.is_empty() {
        return default_title();
    }

    if first_line.chars().count() <= TITLE_MAX_CHARS {
        return first_line.to_string();
    }

    let cut = first_line
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect::<String>();

    return format!("{}...", cut.trim_end());
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Empty for a transient chat that has never been persisted.
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default = "timestamp::now", deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl Default for Chat {
    fn default() -> Chat {
        return Chat::transient();
    }
}

impl Chat {
    pub fn new(id: &str) -> Chat {
        return Chat {
            id: id.to_string(),
            title: default_title(),
            messages: vec![],
            created_at: timestamp::now(),
        };
    }

    pub fn transient() -> Chat {
        return Chat::new("");
    }

    pub fn is_transient(&self) -> bool {
        return self.id.is_empty();
    }

    pub fn len(&self) -> usize {
        return self.messages.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.messages.is_empty();
    }

    pub fn push(&mut self, message: ChatMessage) {
        if message.role == Author::User && self.title == DEFAULT_TITLE {
            self.title = derive_title(&message.content);
        }

        self.messages.push(message);
    }

    /// Replaces the content of the user message at `index` and drops every
    /// message after it, leaving `index + 1` messages.
    pub fn edit_message(&mut self, index: usize, content: &str) -> Result<&ChatMessage> {
        if index >= self.messages.len() {
            bail!(format!(
                "No message at position {index}, chat has {} messages",
                self.messages.len()
            ));
        }
        if self.messages[index].role != Author::User {
            bail!(format!("Message at position {index} was not written by the user"));
        }

        self.messages.truncate(index + 1);

        let message = &mut self.messages[index];
        message.content = content.to_string();
        message.edited = Some(true);
        message.timestamp = timestamp::now();

        return Ok(&self.messages[index]);
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        return self.messages.last();
    }
}
