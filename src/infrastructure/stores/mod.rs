pub mod file;
pub mod memory;

use std::path;
use std::sync::Arc;

use crate::domain::models::StorageName;
use crate::domain::models::StoreBox;

pub struct StoreManager {}

impl StoreManager {
    pub fn get(name: StorageName, dir: &str) -> StoreBox {
        match name {
            StorageName::Memory => return Arc::new(memory::Memory::default()),
            StorageName::File => {
                return Arc::new(file::File::new(path::PathBuf::from(dir)));
            }
        }
    }
}
