use super::Storage;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Reads references as filesystem paths, relative to `base_path`.
pub struct LocalStorage {
    base_path: PathBuf,
    stdin_aliases: Vec<String>,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            stdin_aliases: Vec::new(),
        }
    }

    /// References in `aliases` read standard input instead of a file.
    pub fn with_stdin_aliases(mut self, aliases: Vec<String>) -> Self {
        self.stdin_aliases = aliases;
        self
    }

    pub(crate) fn is_stdin(&self, reference: &str) -> bool {
        self.stdin_aliases.iter().any(|alias| alias == reference)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn get(&self, reference: &str) -> io::Result<Bytes> {
        let mut buf = Vec::new();
        if self.is_stdin(reference) {
            tokio::io::stdin().read_to_end(&mut buf).await?;
        } else {
            // An absolute reference replaces the base path entirely.
            let full_path = self.base_path.join(reference);
            let mut file = File::open(full_path).await?;
            file.read_to_end(&mut buf).await?;
        }
        Ok(Bytes::from(buf))
    }
}
