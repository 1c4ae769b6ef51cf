//! # Storage Traits
//!
//! Abstractions over the document store and the blob store so the domain
//! layer works the same against the in-memory store, the YAML file store or
//! any other backend.

use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use tokio::sync::broadcast;

use super::document::{Document, FieldValue};

/// Single-field predicate of a query
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(String, FieldValue),
    /// The field is one of the given values
    In(String, Vec<FieldValue>),
    /// The string-list field contains the value
    ArrayContains(String, String),
    GreaterOrEqual(String, FieldValue),
    LessOrEqual(String, FieldValue),
}

impl Filter {
    pub fn equals(field: &str, value: impl Into<FieldValue>) -> Self {
        Filter::Equals(field.to_string(), value.into())
    }

    pub fn array_contains(field: &str, value: &str) -> Self {
        Filter::ArrayContains(field.to_string(), value.to_string())
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::Equals(field, expected) => document.fields.get(field) == Some(expected),
            Filter::In(field, candidates) => document
                .fields
                .get(field)
                .map(|value| candidates.contains(value))
                .unwrap_or(false),
            Filter::ArrayContains(field, expected) => match document.fields.get(field) {
                Some(FieldValue::StringList(values)) => values.iter().any(|v| v == expected),
                _ => false,
            },
            Filter::GreaterOrEqual(field, bound) => document
                .fields
                .get(field)
                .and_then(|value| value.compare(bound))
                .map(|ordering| ordering != Ordering::Less)
                .unwrap_or(false),
            Filter::LessOrEqual(field, bound) => document
                .fields
                .get(field)
                .and_then(|value| value.compare(bound))
                .map(|ordering| ordering != Ordering::Greater)
                .unwrap_or(false),
        }
    }
}

/// Filter / order / limit query over one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub filters: Vec<Filter>,
    pub order_by: Option<String>,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, descending: bool) -> Self {
        self.order_by = Some(field.to_string());
        self.descending = descending;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the query against a full scan of a collection
    pub fn apply(&self, documents: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut matching: Vec<Document> = documents
            .into_iter()
            .filter(|document| self.filters.iter().all(|filter| filter.matches(document)))
            .collect();

        if let Some(field) = &self.order_by {
            matching.sort_by(|a, b| {
                let ordering = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                };
                // Ties keep a stable order by id
                let ordering = ordering.then_with(|| a.id.cmp(&b.id));
                if self.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        if let Some(limit) = self.limit {
            matching.truncate(limit);
        }
        matching
    }
}

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put { collection: String, document: Document },
    Delete { collection: String, id: String },
}

/// Writes applied all together or not at all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, collection: &str, document: Document) -> &mut Self {
        self.ops.push(WriteOp::Put {
            collection: collection.to_string(),
            document,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// Notification sent to subscribers after a write lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
}

impl DocumentChange {
    pub fn from_op(op: &WriteOp) -> Self {
        match op {
            WriteOp::Put { collection, document } => Self {
                collection: collection.clone(),
                id: document.id.clone(),
                kind: ChangeKind::Upserted,
            },
            WriteOp::Delete { collection, id } => Self {
                collection: collection.clone(),
                id: id.clone(),
                kind: ChangeKind::Deleted,
            },
        }
    }
}

/// Trait defining the interface for document storage operations
///
/// Documents are grouped in named collections and keyed by string id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Retrieve a document by id
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Insert or replace a document
    async fn put(&self, collection: &str, document: &Document) -> Result<()>;

    /// Delete a document
    /// Returns true if the document existed
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Run a filter/order/limit query over a collection
    async fn query(&self, collection: &str, query: &DocumentQuery) -> Result<Vec<Document>>;

    /// Apply every write of the batch atomically
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Live change notifications for every collection
    fn subscribe(&self) -> broadcast::Receiver<DocumentChange>;
}

/// Trait defining the interface for photo storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the bytes for an entity and return a retrievable URL
    async fn upload(&self, entity_type: &str, entity_id: &str, bytes: &[u8]) -> Result<String>;

    async fn download(&self, entity_type: &str, entity_id: &str) -> Result<Option<Vec<u8>>>;

    /// Returns true if a blob was removed
    async fn delete(&self, entity_type: &str, entity_id: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, baby: &str, amount: f64, tags: &[&str]) -> Document {
        let mut document = Document::new(id);
        document
            .set("babyId", baby)
            .set("amountMl", amount)
            .set("tags", tags.iter().map(|t| t.to_string()).collect::<Vec<_>>());
        document
    }

    #[test]
    fn test_query_filters_orders_and_limits() {
        let documents = vec![
            doc("a", "baby-1", 120.0, &["x"]),
            doc("b", "baby-2", 90.0, &[]),
            doc("c", "baby-1", 60.0, &["x", "y"]),
            doc("d", "baby-1", 150.0, &["y"]),
        ];

        let query = DocumentQuery::new()
            .filter(Filter::equals("babyId", "baby-1"))
            .filter(Filter::GreaterOrEqual("amountMl".into(), FieldValue::Float(100.0)))
            .order_by("amountMl", true);
        let ids: Vec<String> = query.apply(documents.clone()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["d", "a"]);

        let query = DocumentQuery::new()
            .filter(Filter::array_contains("tags", "x"))
            .order_by("amountMl", false)
            .limit(1);
        let ids: Vec<String> = query.apply(documents).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn test_in_filter() {
        let documents = vec![doc("a", "baby-1", 1.0, &[]), doc("b", "baby-2", 1.0, &[])];
        let query = DocumentQuery::new().filter(Filter::In(
            "babyId".into(),
            vec![FieldValue::from("baby-2"), FieldValue::from("baby-3")],
        ));
        let result = query.apply(documents);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "b");
    }
}
