use std::{collections::HashMap, sync::Mutex};

use anyhow::anyhow;
use async_trait::async_trait;

use super::{key_from_uri, new_key, ObjectStorage};

const PUBLIC_URL: &str = "memory://objects";

/// Keeps objects in memory. Used when no storage directory is configured and
/// in tests.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryObjectStorage {
    /// The content type and bytes of a stored object.
    pub fn get(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        content_type: &str,
        bytes: Vec<u8>,
        key: Option<&str>,
    ) -> anyhow::Result<String> {
        let key = key
            .map(str::to_owned)
            .unwrap_or_else(|| new_key(content_type));

        self.objects
            .lock()
            .map_err(|_| anyhow!("object storage lock is poisoned"))?
            .insert(key.clone(), (content_type.to_owned(), bytes));

        Ok(format!("{}/{}", PUBLIC_URL, key))
    }

    async fn remove(&self, uri: &str) -> anyhow::Result<()> {
        if let Some(key) = self.key_for(uri) {
            self.objects
                .lock()
                .map_err(|_| anyhow!("object storage lock is poisoned"))?
                .remove(&key);
        }

        Ok(())
    }

    fn key_for(&self, uri: &str) -> Option<String> {
        key_from_uri(PUBLIC_URL, uri)
    }
}
