#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::fs;
use std::io::ErrorKind;
use std::path;

use anyhow::Context;
use anyhow::Result;
use uuid::Uuid;

use crate::domain::models::KeyValueStore;

// Leaves room for the `.json.tmp` suffix under the common 255 byte file name
// limit.
const MAX_STEM_LEN: usize = 200;
const KEPT_PREFIX_LEN: usize = 150;

/// One JSON file per key inside `dir`. Writes go through a temporary file and
/// a rename so a record is either fully old or fully new.
pub struct File {
    pub dir: path::PathBuf,
}

impl File {
    pub fn new(dir: path::PathBuf) -> File {
        return File { dir };
    }

    fn get_file_path(&self, key: &str) -> path::PathBuf {
        return self.dir.join(format!("{}.json", file_stem(key)));
    }
}

impl KeyValueStore for File {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let file_path = self.get_file_path(key);
        match fs::read_to_string(&file_path) {
            Ok(payload) => return Ok(Some(payload)),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| return format!("Failed to read {}", file_path.display()));
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let file_path = self.get_file_path(key);
        let tmp_path = file_path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &file_path)?;

        return Ok(());
    }

    fn delete(&self, key: &str) -> Result<()> {
        let file_path = self.get_file_path(key);
        if !file_path.exists() {
            return Ok(());
        }

        fs::remove_file(file_path)?;
        return Ok(());
    }
}

/// Keys become file names, so anything outside `[A-Za-z0-9_-]` is written as
/// `%XX` per byte.
pub fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }

    return escaped;
}

/// File name for `key` without the extension. Escaped keys that would be too
/// long keep a readable prefix followed by `~` and a name based uuid of the
/// full key. `~` never appears in an escaped key, so shortened names can't
/// collide with regular ones.
pub fn file_stem(key: &str) -> String {
    let escaped = escape_key(key);
    if escaped.len() <= MAX_STEM_LEN {
        return escaped;
    }

    let digest = Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes());
    return format!("{}~{}", &escaped[..KEPT_PREFIX_LEN], digest.simple());
}
