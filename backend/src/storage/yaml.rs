//! # YAML Document Store
//!
//! File-based document store keeping one YAML file per document.
//!
//! ## File Structure
//!
//! ```text
//! data/
//! ├── babies/
//! │   └── {baby_id}.yaml
//! ├── events/
//! │   └── {event_id}.yaml
//! ├── families/
//! └── users/
//! ```
//!
//! Writes go to a temp file first and are renamed into place. A batch is fully
//! serialized before the first file is touched, so a document that cannot be
//! encoded never leaves the batch half applied.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use super::document::Document;
use super::traits::{DocumentChange, DocumentQuery, DocumentStore, WriteBatch, WriteOp};

const CHANGE_CHANNEL_CAPACITY: usize = 256;
const DOCUMENT_EXTENSION: &str = "yaml";

/// Staged form of a write, ready to hit the disk
enum StagedWrite {
    Put { path: PathBuf, content: String },
    Delete { path: PathBuf },
}

#[derive(Clone)]
pub struct YamlDocumentStore {
    base_directory: PathBuf,
    /// Serializes writers so batches never interleave
    write_lock: Arc<Mutex<()>>,
    changes: broadcast::Sender<DocumentChange>,
}

impl YamlDocumentStore {
    /// Open a store rooted at `base_directory`, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .with_context(|| format!("Failed to create data directory {}", base_path.display()))?;
            info!("Created data directory: {}", base_path.display());
        }
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            base_directory: base_path,
            write_lock: Arc::new(Mutex::new(())),
            changes,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn collection_directory(&self, collection: &str) -> Result<PathBuf> {
        Self::check_path_segment(collection)?;
        Ok(self.base_directory.join(collection))
    }

    fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf> {
        Self::check_path_segment(id)?;
        Ok(self
            .collection_directory(collection)?
            .join(format!("{}.{}", id, DOCUMENT_EXTENSION)))
    }

    /// Ids and collection names become file names, so keep them to one path segment
    fn check_path_segment(segment: &str) -> Result<()> {
        if segment.is_empty()
            || segment == "."
            || segment == ".."
            || segment.contains(['/', '\\'])
        {
            bail!("Invalid document path segment: {:?}", segment);
        }
        Ok(())
    }

    fn read_document(path: &Path) -> Result<Document> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn stage(&self, op: &WriteOp) -> Result<StagedWrite> {
        match op {
            WriteOp::Put { collection, document } => Ok(StagedWrite::Put {
                path: self.document_path(collection, &document.id)?,
                content: serde_yaml::to_string(document)
                    .with_context(|| format!("Failed to encode document {}", document.id))?,
            }),
            WriteOp::Delete { collection, id } => Ok(StagedWrite::Delete {
                path: self.document_path(collection, id)?,
            }),
        }
    }

    fn write_staged(staged: &[StagedWrite]) -> Result<()> {
        // Temp files first; nothing visible changes until the renames below
        let mut pending = Vec::new();
        for write in staged {
            if let StagedWrite::Put { path, content } = write {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let temp_path = path.with_extension("tmp");
                fs::write(&temp_path, content)
                    .with_context(|| format!("Failed to write {}", temp_path.display()))?;
                pending.push((temp_path, path));
            }
        }

        for (temp_path, path) in pending {
            fs::rename(&temp_path, path)
                .with_context(|| format!("Failed to move {} into place", temp_path.display()))?;
        }

        for write in staged {
            if let StagedWrite::Delete { path } = write {
                if path.exists() {
                    fs::remove_file(path)
                        .with_context(|| format!("Failed to delete {}", path.display()))?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for YamlDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let path = self.document_path(collection, id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read_document(&path).map(Some)
    }

    async fn put(&self, collection: &str, document: &Document) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(collection, document.clone());
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let path = self.document_path(collection, id)?;
        let _guard = self.write_lock.lock().await;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        let _ = self.changes.send(DocumentChange::from_op(&WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }));
        Ok(true)
    }

    async fn query(&self, collection: &str, query: &DocumentQuery) -> Result<Vec<Document>> {
        let directory = self.collection_directory(collection)?;
        if !directory.exists() {
            debug!("Collection {} has no directory yet", collection);
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in fs::read_dir(&directory)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            match Self::read_document(&path) {
                Ok(document) => documents.push(document),
                Err(e) => warn!("Skipping unreadable document {}: {:#}", path.display(), e),
            }
        }
        Ok(query.apply(documents))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let staged = batch
            .ops
            .iter()
            .map(|op| self.stage(op))
            .collect::<Result<Vec<_>>>()?;

        {
            let _guard = self.write_lock.lock().await;
            Self::write_staged(&staged)
                .map_err(|e| anyhow!("Batch of {} writes failed: {:#}", batch.len(), e))?;
        }

        debug!("Committed batch of {} writes", batch.len());
        for op in &batch.ops {
            let _ = self.changes.send(DocumentChange::from_op(op));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::TestEnvironment;
    use crate::storage::traits::Filter;

    fn doc(id: &str, baby: &str) -> Document {
        let mut document = Document::new(id);
        document.set("babyId", baby).set("amountMl", 120.5);
        document
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let env = TestEnvironment::new().unwrap();
        let store = YamlDocumentStore::new(env.base_directory()).unwrap();
        store.put("events", &doc("e1", "b1")).await.unwrap();

        let reopened = YamlDocumentStore::new(env.base_directory()).unwrap();
        let fetched = reopened.get("events", "e1").await.unwrap();
        assert_eq!(fetched, Some(doc("e1", "b1")));
        assert!(env.base_directory().join("events").join("e1.yaml").exists());
    }

    #[tokio::test]
    async fn test_query_and_batch_delete() {
        let env = TestEnvironment::new().unwrap();
        let store = YamlDocumentStore::new(env.base_directory()).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .put("events", doc("e1", "b1"))
            .put("events", doc("e2", "b1"))
            .put("events", doc("e3", "b2"));
        store.commit(batch).await.unwrap();

        let query = DocumentQuery::new().filter(Filter::equals("babyId", "b1"));
        assert_eq!(store.query("events", &query).await.unwrap().len(), 2);

        let mut batch = WriteBatch::new();
        batch.delete("events", "e1").delete("events", "e2");
        store.commit(batch).await.unwrap();
        assert!(store.query("events", &query).await.unwrap().is_empty());
        assert!(store.get("events", "e3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal_ids() {
        let env = TestEnvironment::new().unwrap();
        let store = YamlDocumentStore::new(env.base_directory()).unwrap();
        assert!(store.get("events", "../secrets").await.is_err());
        assert!(store.put("..", &doc("e1", "b1")).await.is_err());
    }

    #[tokio::test]
    async fn test_unreadable_files_are_skipped() {
        let env = TestEnvironment::new().unwrap();
        let store = YamlDocumentStore::new(env.base_directory()).unwrap();
        store.put("events", &doc("e1", "b1")).await.unwrap();
        fs::write(env.base_directory().join("events").join("broken.yaml"), ": : :").unwrap();

        let all = store.query("events", &DocumentQuery::new()).await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
