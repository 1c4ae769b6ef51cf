//! In-process document store.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use super::document::Document;
use super::traits::{DocumentChange, DocumentQuery, DocumentStore, WriteBatch, WriteOp};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// Document store kept entirely in memory. Clones share the same data.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    changes: broadcast::Sender<DocumentChange>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    fn notify(&self, change: DocumentChange) {
        // No receivers is fine
        let _ = self.changes.send(change);
    }

    fn apply(collections: &mut Collections, op: &WriteOp) -> bool {
        match op {
            WriteOp::Put { collection, document } => {
                collections
                    .entry(collection.clone())
                    .or_default()
                    .insert(document.id.clone(), document.clone());
                true
            }
            WriteOp::Delete { collection, id } => collections
                .get_mut(collection)
                .map(|documents| documents.remove(id).is_some())
                .unwrap_or(false),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| anyhow!("document store lock poisoned"))?;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, document: &Document) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(collection, document.clone());
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let op = WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        let existed = {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| anyhow!("document store lock poisoned"))?;
            Self::apply(&mut collections, &op)
        };
        if existed {
            self.notify(DocumentChange::from_op(&op));
        }
        Ok(existed)
    }

    async fn query(&self, collection: &str, query: &DocumentQuery) -> Result<Vec<Document>> {
        let documents: Vec<Document> = {
            let collections = self
                .collections
                .read()
                .map_err(|_| anyhow!("document store lock poisoned"))?;
            collections
                .get(collection)
                .map(|documents| documents.values().cloned().collect())
                .unwrap_or_default()
        };
        Ok(query.apply(documents))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| anyhow!("document store lock poisoned"))?;
            for op in &batch.ops {
                Self::apply(&mut collections, op);
            }
        }
        debug!("Committed batch of {} writes", batch.len());
        for op in &batch.ops {
            self.notify(DocumentChange::from_op(op));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }
}
