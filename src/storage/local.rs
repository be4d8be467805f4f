use std::{io::ErrorKind, path::PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info};

use super::{key_from_uri, new_key, ObjectStorage};

/// Stores objects as files in a directory that is served under a public URL.
pub struct LocalObjectStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: PathBuf, public_url: String) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(
        &self,
        content_type: &str,
        bytes: Vec<u8>,
        key: Option<&str>,
    ) -> anyhow::Result<String> {
        let key = key
            .map(str::to_owned)
            .unwrap_or_else(|| new_key(content_type));

        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create storage directory {:?}.", self.root))?;

        let path = self.root.join(&key);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write object to {:?}.", path))?;

        info!(%key, %content_type, "Stored object.");

        Ok(format!("{}/{}", self.public_url, key))
    }

    async fn remove(&self, uri: &str) -> anyhow::Result<()> {
        let key = match self.key_for(uri) {
            Some(key) => key,
            None => {
                debug!(%uri, "Ignoring removal of object from a foreign URI.");

                return Ok(());
            }
        };

        match tokio::fs::remove_file(self.root.join(&key)).await {
            Ok(()) => {
                info!(%key, "Removed object.");

                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => {
                Err(anyhow::Error::from(error).context(format!("Failed to remove object {}.", key)))
            }
        }
    }

    fn key_for(&self, uri: &str) -> Option<String> {
        key_from_uri(&self.public_url, uri)
    }
}
