use std::path;

use serde_derive::Deserialize;
use serde_derive::Serialize;

/// Describes a file sent alongside a message. Only the descriptor is kept,
/// never the file contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub media_type: String,
}

impl Attachment {
    pub fn new(name: &str, size: u64, media_type: &str) -> Attachment {
        return Attachment {
            name: name.to_string(),
            size,
            media_type: media_type.to_string(),
        };
    }

    pub fn media_type_for(file_path: &path::Path) -> String {
        let extension = file_path
            .extension()
            .map(|ext| return ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let media_type = match extension.as_str() {
            "csv" => "text/csv",
            "gif" => "image/gif",
            "htm" | "html" => "text/html",
            "jpeg" | "jpg" => "image/jpeg",
            "json" => "application/json",
            "md" => "text/markdown",
            "pdf" => "application/pdf",
            "png" => "image/png",
            "svg" => "image/svg+xml",
            "txt" => "text/plain",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        };

        return media_type.to_string();
    }
}
