use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use shared::{Event, EventKind, FeedType};
use std::sync::Arc;

use crate::storage::document::FieldValue;
use crate::storage::mappers::event_mapper::{BABY_ID, EVENT_TYPE, FEED_TYPE, TIMESTAMP};
use crate::storage::mappers::EventMapper;
use crate::storage::traits::{DocumentQuery, DocumentStore, Filter};

/// Typed access to the `events` collection
#[derive(Clone)]
pub struct EventRepository {
    store: Arc<dyn DocumentStore>,
}

impl EventRepository {
    pub const COLLECTION: &'static str = "events";

    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn store_event(&self, event: &Event) -> Result<()> {
        self.store
            .put(Self::COLLECTION, &EventMapper::to_document(event))
            .await
            .with_context(|| format!("Failed to store event {}", event.id))
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        let document = self.store.get(Self::COLLECTION, event_id).await?;
        Ok(document.as_ref().and_then(EventMapper::from_document))
    }

    /// Events of one baby, newest first, optionally restricted by kind and time range
    pub async fn list_events(
        &self,
        baby_id: &str,
        kinds: &[EventKind],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<Event>> {
        let mut query = DocumentQuery::new()
            .filter(Filter::equals(BABY_ID, baby_id))
            .order_by(TIMESTAMP, true);
        if !kinds.is_empty() {
            query = query.filter(Filter::In(
                EVENT_TYPE.to_string(),
                kinds.iter().map(|kind| FieldValue::from(kind.as_str())).collect(),
            ));
        }
        if let Some(from) = from {
            query = query.filter(Filter::GreaterOrEqual(TIMESTAMP.to_string(), from.into()));
        }
        if let Some(to) = to {
            query = query.filter(Filter::LessOrEqual(TIMESTAMP.to_string(), to.into()));
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let documents = self.store.query(Self::COLLECTION, &query).await?;
        let total = documents.len();
        let events: Vec<Event> = documents.iter().filter_map(EventMapper::from_document).collect();
        if events.len() < total {
            debug!("Dropped {} undecodable events for baby {}", total - events.len(), baby_id);
        }
        Ok(events)
    }

    /// The most recent `limit` feedings or pumping sessions in chronological order
    pub async fn amount_history(
        &self,
        baby_id: &str,
        kind: EventKind,
        feed_type: Option<FeedType>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let mut query = DocumentQuery::new()
            .filter(Filter::equals(BABY_ID, baby_id))
            .filter(Filter::equals(EVENT_TYPE, kind.as_str()))
            .order_by(TIMESTAMP, true)
            .limit(limit);
        if let Some(feed_type) = feed_type {
            query = query.filter(Filter::equals(FEED_TYPE, feed_type.as_str()));
        }

        let documents = self.store.query(Self::COLLECTION, &query).await?;
        let mut events: Vec<Event> = documents.iter().filter_map(EventMapper::from_document).collect();
        events.reverse();
        Ok(events)
    }

    /// Ids of every stored event of a baby, including records that no longer decode
    pub async fn event_ids_for_baby(&self, baby_id: &str) -> Result<Vec<String>> {
        let query = DocumentQuery::new().filter(Filter::equals(BABY_ID, baby_id));
        let documents = self.store.query(Self::COLLECTION, &query).await?;
        Ok(documents.into_iter().map(|document| document.id).collect())
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<bool> {
        self.store.delete(Self::COLLECTION, event_id).await
    }
}
