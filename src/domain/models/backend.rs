#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::Attachment;

pub struct BackendPrompt {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl BackendPrompt {
    pub fn new(text: &str, attachments: &[Attachment]) -> BackendPrompt {
        return BackendPrompt {
            text: text.to_string(),
            attachments: attachments.to_vec(),
        };
    }

    pub fn attachment_summary(&self) -> Option<String> {
        if self.attachments.is_empty() {
            return None;
        }

        let names = self
            .attachments
            .iter()
            .map(|file| return file.name.to_string())
            .collect::<Vec<String>>()
            .join(", ");

        let noun = if self.attachments.len() == 1 {
            "file"
        } else {
            "files"
        };

        return Some(format!("{} {noun}: {names}", self.attachments.len()));
    }
}

/// A finished reply for the request numbered `generation` on chat `chat_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendResponse {
    pub chat_id: String,
    pub generation: u64,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendFailure {
    pub chat_id: String,
    pub generation: u64,
    pub message: String,
}

#[async_trait]
pub trait Backend {
    /// Used at startup to verify the backend can serve replies.
    async fn health_check(&self) -> Result<()>;

    /// Produces the full assistant reply for a prompt.
    async fn get_completion(&self, prompt: BackendPrompt) -> Result<String>;
}

pub type BackendBox = Arc<dyn Backend + Send + Sync>;
