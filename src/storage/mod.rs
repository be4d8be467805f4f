use std::sync::Arc;

use async_trait::async_trait;

mod local;
mod memory;

pub use local::LocalObjectStorage;
pub use memory::MemoryObjectStorage;

pub type DynObjectStorage = Arc<dyn ObjectStorage>;

/// A store for binary objects, such as photos, that are served from a public
/// URI.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store an object and return the URI it is served from.
    ///
    /// # Arguments
    ///
    /// * `content_type` - The MIME type of the object.
    /// * `bytes` - The object's content.
    /// * `key` - If provided, the object replaces the one stored under this
    ///   key. Otherwise a new key is generated.
    async fn upload(
        &self,
        content_type: &str,
        bytes: Vec<u8>,
        key: Option<&str>,
    ) -> anyhow::Result<String>;

    /// Remove the object served from a URI. Removing an object that does not
    /// exist is not an error.
    async fn remove(&self, uri: &str) -> anyhow::Result<()>;

    /// The key of the object served from a URI, if the URI belongs to this
    /// store.
    fn key_for(&self, uri: &str) -> Option<String>;
}

/// The file extension used for objects of a given content type.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Generate a fresh object key for a content type.
pub fn new_key(content_type: &str) -> String {
    format!("{}.{}", uuid::Uuid::new_v4(), extension_for(content_type))
}

fn key_from_uri(public_url: &str, uri: &str) -> Option<String> {
    let key = uri
        .strip_prefix(public_url.trim_end_matches('/'))?
        .strip_prefix('/')?;

    // Keys are flat file names.
    if key.is_empty() || key.contains('/') || key.contains("..") {
        None
    } else {
        Some(key.to_owned())
    }
}
