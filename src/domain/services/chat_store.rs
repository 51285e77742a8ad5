#[cfg(test)]
#[path = "chat_store_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use super::Notifier;
use crate::domain::models::Chat;
use crate::domain::models::ChatAction;
use crate::domain::models::StoreBox;

pub const DEFAULT_KEY_PREFIX: &str = "chat_";

/// Maps chat ids to persisted chat records, one record per chat.
#[derive(Clone)]
pub struct ChatStore {
    store: StoreBox,
    notifier: Arc<Notifier>,
    key_prefix: String,
}

impl ChatStore {
    pub fn new(store: StoreBox, notifier: Arc<Notifier>, key_prefix: &str) -> ChatStore {
        return ChatStore {
            store,
            notifier,
            key_prefix: key_prefix.to_string(),
        };
    }

    pub fn create_id() -> String {
        return Uuid::new_v4()
            .to_string()
            .split('-')
            .enumerate()
            .filter_map(|(idx, str)| {
                if idx > 1 {
                    return None;
                }
                return Some(str);
            })
            .collect::<Vec<&str>>()
            .join("-");
    }

    pub fn key(&self, id: &str) -> String {
        return format!("{}{id}", self.key_prefix);
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        return &self.notifier;
    }

    /// Returns the stored chat, or `None` when it is missing or unreadable.
    pub fn load(&self, id: &str) -> Option<Chat> {
        if id.is_empty() {
            return None;
        }

        let payload = match self.store.get(&self.key(id)) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(chat_id = id, error = ?err, "Failed to read chat");
                return None;
            }
        };

        let mut chat = match serde_json::from_str::<Chat>(&payload) {
            Ok(chat) => chat,
            Err(err) => {
                tracing::warn!(chat_id = id, error = ?err, "Ignoring corrupt chat record");
                return None;
            }
        };

        if chat.id != id {
            tracing::debug!(chat_id = id, stored_id = %chat.id, "Stored id differs from key");
            chat.id = id.to_string();
        }

        return Some(chat);
    }

    /// Overwrites the record for `chat.id` and emits a `save` event. Transient
    /// chats are skipped.
    pub fn save(&self, chat: &Chat) -> Result<()> {
        if chat.is_transient() {
            return Ok(());
        }

        let payload = serde_json::to_string(chat)?;
        self.store.set(&self.key(&chat.id), &payload)?;
        tracing::debug!(chat_id = %chat.id, messages = chat.len(), "Saved chat");

        self.notifier.emit(&chat.id, ChatAction::Save);
        return Ok(());
    }

    /// True when a record is stored under `id`, even one that fails to parse.
    pub fn exists(&self, id: &str) -> Result<bool> {
        if id.is_empty() {
            return Ok(false);
        }

        return Ok(self.store.get(&self.key(id))?.is_some());
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Ok(());
        }

        self.store.delete(&self.key(id))?;
        return Ok(());
    }
}
