//! Binary image storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use pixora_core::types::UserId;

/// Fallback when the bytes are not a recognisable image format.
const FALLBACK_EXTENSION: &str = "png";
const FALLBACK_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key/value store for generated image bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Extension and MIME type for image bytes, sniffed from their header.
pub fn sniff_format(bytes: &[u8]) -> (&'static str, &'static str) {
    match image::guess_format(bytes) {
        Ok(format) => (
            format
                .extensions_str()
                .first()
                .copied()
                .unwrap_or(FALLBACK_EXTENSION),
            format.to_mime_type(),
        ),
        Err(_) => (FALLBACK_EXTENSION, FALLBACK_CONTENT_TYPE),
    }
}

/// Build a fresh storage key: `{user_id}/{uuid-v7}.{ext}`.
///
/// v7 ids sort by creation time, so a user's prefix lists oldest first.
pub fn storage_key_for(user_id: UserId, extension: &str) -> String {
    format!("{user_id}/{}.{extension}", uuid::Uuid::now_v7())
}

// ---------------------------------------------------------------------------
// Local filesystem store
// ---------------------------------------------------------------------------

/// [`ObjectStore`] rooted at a directory on local disk.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `key` under the root, rejecting absolute paths and `..`.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, content_type, size = bytes.len(), "Stored image");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0];

    #[test]
    fn sniffs_known_formats() {
        assert_eq!(sniff_format(PNG_HEADER), ("png", "image/png"));
        assert_eq!(sniff_format(JPEG_HEADER).1, "image/jpeg");
    }

    #[test]
    fn unknown_bytes_fall_back_to_png() {
        assert_eq!(sniff_format(b"not an image"), ("png", "image/png"));
    }

    #[test]
    fn storage_key_is_scoped_by_user() {
        let user = UserId::new_v4();
        let key = storage_key_for(user, "webp");
        assert!(key.starts_with(&format!("{user}/")));
        assert!(key.ends_with(".webp"));
    }

    #[tokio::test]
    async fn put_and_delete_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.put("u1/a.png", PNG_HEADER, "image/png").await.unwrap();
        let written = tokio::fs::read(dir.path().join("u1/a.png")).await.unwrap();
        assert_eq!(written, PNG_HEADER);

        store.delete("u1/a.png").await.unwrap();
        assert!(!dir.path().join("u1/a.png").exists());
        // Deleting twice is fine.
        store.delete("u1/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        assert_matches!(
            store.put("../evil.png", b"x", "image/png").await,
            Err(StorageError::InvalidKey(_))
        );
        assert_matches!(
            store.put("/etc/evil.png", b"x", "image/png").await,
            Err(StorageError::InvalidKey(_))
        );
        assert_matches!(store.delete("").await, Err(StorageError::InvalidKey(_)));
    }
}
