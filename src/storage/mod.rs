use std::io;

use async_trait::async_trait;
use bytes::Bytes;

mod local;
mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

use crate::config::StorageConfig;

/// Source of the raw bytes behind a table reference.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the whole file a reference names.
    async fn get(&self, reference: &str) -> io::Result<Bytes>;
}

/// Create the filesystem-backed storage described by `config`
pub fn from_config(config: &StorageConfig) -> LocalStorage {
    LocalStorage::new(config.base_dir.clone()).with_stdin_aliases(config.stdin_aliases.clone())
}
