use std::collections::HashMap;
use std::io;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::Storage;

/// In-memory file map keyed by the exact reference string.
#[derive(Default)]
pub struct MemoryStorage {
    files: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reference: impl Into<String>, data: impl Into<Bytes>) {
        self.files
            .write()
            .insert(reference.into(), data.into());
    }

    pub fn remove(&self, reference: &str) -> Option<Bytes> {
        self.files
            .write()
            .remove(reference)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, reference: &str) -> io::Result<Bytes> {
        self.files
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}
