use std::sync::Arc;

use anyhow::Result;
use strum::EnumIter;
use strum::EnumVariantNames;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StorageName {
    Memory,
    File,
}

impl StorageName {
    pub fn parse(text: String) -> Option<StorageName> {
        return text.parse::<StorageName>().ok();
    }
}

/// Synchronous string key-value storage, atomic per key. Implementations use
/// interior mutability so one store can be shared between views.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;
}

pub type StoreBox = Arc<dyn KeyValueStore>;
