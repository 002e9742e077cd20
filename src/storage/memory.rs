use crate::state::lock;
use crate::storage::{resolve_within, Storage};
use crate::{MirrorError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::Mutex;

/// Keeps saved resources in memory, keyed by path
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.files).get(path).cloned()
    }

    /// Contents at `path` as text
    pub fn text(&self, path: &str) -> Option<String> {
        self.get(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Saved paths in sorted order
    pub fn paths(&self) -> Vec<String> {
        lock(&self.files).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.files).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.files).is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<()> {
        if resolve_within(Path::new("/"), path).is_none() {
            return Err(MirrorError::Persist {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "invalid storage path"),
            });
        }
        lock(&self.files).insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        lock(&self.files).clear();
        Ok(())
    }
}
