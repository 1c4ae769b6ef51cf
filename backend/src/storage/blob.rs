//! Filesystem photo storage keyed by `(entity_type, entity_id)`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use super::traits::BlobStore;

const PHOTO_EXTENSION: &str = "jpg";

#[derive(Clone)]
pub struct FsBlobStore {
    base_directory: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)
            .with_context(|| format!("Failed to create photo directory {}", base_path.display()))?;
        Ok(Self {
            base_directory: base_path,
        })
    }

    fn blob_path(&self, entity_type: &str, entity_id: &str) -> Result<PathBuf> {
        for segment in [entity_type, entity_id] {
            if segment.is_empty() || segment.contains(['/', '\\']) || segment.starts_with('.') {
                bail!("Invalid blob key segment: {:?}", segment);
            }
        }
        Ok(self
            .base_directory
            .join(entity_type)
            .join(format!("{}.{}", entity_id, PHOTO_EXTENSION)))
    }

    /// URL written back onto the owning document
    pub fn url_for(path: &Path) -> String {
        format!("file://{}", path.display())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, entity_type: &str, entity_id: &str, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            bail!("Refusing to store an empty photo for {}/{}", entity_type, entity_id);
        }
        let path = self.blob_path(entity_type, entity_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes).with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)?;

        info!("Stored photo for {}/{} ({} bytes)", entity_type, entity_id, bytes.len());
        Ok(Self::url_for(&path))
    }

    async fn download(&self, entity_type: &str, entity_id: &str) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(entity_type, entity_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(bytes))
    }

    async fn delete(&self, entity_type: &str, entity_id: &str) -> Result<bool> {
        let path = self.blob_path(entity_type, entity_id)?;
        if !path.exists() {
            debug!("No photo to delete for {}/{}", entity_type, entity_id);
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::TestEnvironment;

    #[tokio::test]
    async fn test_upload_download_delete() {
        let env = TestEnvironment::new().unwrap();
        let store = FsBlobStore::new(env.base_directory()).unwrap();

        let url = store.upload("babies", "baby-1", b"jpeg bytes").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("babies/baby-1.jpg"));

        let bytes = store.download("babies", "baby-1").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"jpeg bytes"[..]));

        assert!(store.delete("babies", "baby-1").await.unwrap());
        assert!(!store.delete("babies", "baby-1").await.unwrap());
        assert_eq!(store.download("babies", "baby-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_bad_keys_and_empty_uploads() {
        let env = TestEnvironment::new().unwrap();
        let store = FsBlobStore::new(env.base_directory()).unwrap();
        assert!(store.upload("babies", "../x", b"data").await.is_err());
        assert!(store.upload("events", "e1", b"").await.is_err());
    }
}
