use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Chat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatAction {
    Create,
    Navigate,
    Save,
}

/// Broadcast to every mounted view when a chat is created, saved, or
/// navigated to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    pub chat_id: String,
    pub action: ChatAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_chat: Option<Chat>,
}

impl ChatEvent {
    pub fn new(chat_id: &str, action: ChatAction) -> ChatEvent {
        return ChatEvent {
            chat_id: chat_id.to_string(),
            action,
            new_chat: None,
        };
    }

    pub fn with_chat(mut self, chat: Chat) -> ChatEvent {
        self.new_chat = Some(chat);
        return self;
    }
}
