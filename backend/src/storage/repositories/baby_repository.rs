use anyhow::{Context, Result};
use log::debug;
use shared::Baby;
use std::sync::Arc;

use crate::storage::mappers::baby_mapper::PARENT_IDS;
use crate::storage::mappers::BabyMapper;
use crate::storage::traits::{DocumentQuery, DocumentStore, Filter};

/// Typed access to the `babies` collection
#[derive(Clone)]
pub struct BabyRepository {
    store: Arc<dyn DocumentStore>,
}

impl BabyRepository {
    pub const COLLECTION: &'static str = "babies";

    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn store_baby(&self, baby: &Baby) -> Result<()> {
        self.store
            .put(Self::COLLECTION, &BabyMapper::to_document(baby))
            .await
            .with_context(|| format!("Failed to store baby {}", baby.id))
    }

    pub async fn get_baby(&self, baby_id: &str) -> Result<Option<Baby>> {
        let document = self.store.get(Self::COLLECTION, baby_id).await?;
        Ok(document.as_ref().and_then(BabyMapper::from_document))
    }

    /// Babies the user is a parent of, ordered by name
    pub async fn list_babies_for_parent(&self, user_id: &str) -> Result<Vec<Baby>> {
        let query = DocumentQuery::new()
            .filter(Filter::array_contains(PARENT_IDS, user_id))
            .order_by("name", false);
        let documents = self.store.query(Self::COLLECTION, &query).await?;
        let babies: Vec<Baby> = documents.iter().filter_map(BabyMapper::from_document).collect();
        debug!("Found {} babies for parent {}", babies.len(), user_id);
        Ok(babies)
    }

    pub async fn delete_baby(&self, baby_id: &str) -> Result<bool> {
        self.store.delete(Self::COLLECTION, baby_id).await
    }
}
