use anyhow::Result;
use dashmap::DashMap;

use crate::domain::models::KeyValueStore;

/// Process-lifetime storage, gone when the program exits.
#[derive(Default)]
pub struct Memory {
    entries: DashMap<String, String>,
}

#[cfg(test)]
impl Memory {
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }
}

impl KeyValueStore for Memory {
    fn get(&self, key: &str) -> Result<Option<String>> {
        return Ok(self.entries.get(key).map(|val| return val.to_string()));
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        return Ok(());
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        return Ok(());
    }
}
