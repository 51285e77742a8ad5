#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Utc;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use uuid::Uuid;

use super::timestamp;
use super::Attachment;
use super::Author;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    pub content: String,
    pub role: Author,
    #[serde(default = "timestamp::now", deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "isEdited", skip_serializing_if = "Option::is_none")]
    pub edited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Attachment>>,
}

impl ChatMessage {
    pub fn new(role: Author, content: &str) -> ChatMessage {
        return ChatMessage {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            role,
            timestamp: timestamp::now(),
            edited: None,
            files: None,
        };
    }

    pub fn with_files(mut self, files: Vec<Attachment>) -> ChatMessage {
        if files.is_empty() {
            self.files = None;
        } else {
            self.files = Some(files);
        }

        return self;
    }

    pub fn is_edited(&self) -> bool {
        return self.edited.unwrap_or(false);
    }

    pub fn attachments(&self) -> &[Attachment] {
        return self.files.as_deref().unwrap_or_default();
    }

    pub fn as_string_lines(&self, line_max_width: usize) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();

        for full_line in self.content.split('\n') {
            if full_line.trim().is_empty() {
                lines.push("".to_string());
                continue;
            }

            let mut char_count = 0;
            let mut current_lines: Vec<&str> = vec![];

            for word in full_line.split(' ') {
                let word_len = word.chars().count();
                if !current_lines.is_empty() && word_len + char_count + 1 > line_max_width {
                    lines.push(current_lines.join(" ").trim_end().to_string());
                    current_lines = vec![word];
                    char_count = word_len + 1;
                } else {
                    current_lines.push(word);
                    char_count += word_len + 1;
                }
            }
            if !current_lines.is_empty() {
                lines.push(current_lines.join(" ").trim_end().to_string());
            }
        }

        return lines;
    }
}
