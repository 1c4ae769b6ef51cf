//! # Storage Layer
//!
//! Persistence behind two seams: [`DocumentStore`] for flat, collection-scoped
//! records and [`BlobStore`] for photos. Domain types never reach a store
//! directly; the per-entity mappers translate them into [`Document`]s and the
//! repositories expose typed CRUD on top.

pub mod blob;
pub mod document;
pub mod mappers;
pub mod memory;
pub mod repositories;
pub mod traits;
pub mod yaml;

#[cfg(test)]
pub mod test_utils;

pub use blob::FsBlobStore;
pub use document::{Document, FieldValue};
pub use memory::MemoryDocumentStore;
pub use repositories::{BabyRepository, EventRepository, FamilyRepository, StoredUser, UserRepository};
pub use traits::{BlobStore, DocumentChange, DocumentQuery, DocumentStore, Filter, WriteBatch};
pub use yaml::YamlDocumentStore;
