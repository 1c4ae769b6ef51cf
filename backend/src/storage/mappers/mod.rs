//! Explicit per-entity field mapping between domain types and stored documents.

pub mod baby_mapper;
pub mod event_mapper;
pub mod family_mapper;

pub use baby_mapper::BabyMapper;
pub use event_mapper::EventMapper;
pub use family_mapper::FamilyMapper;
