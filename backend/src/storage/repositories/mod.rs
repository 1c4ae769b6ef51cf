//! Typed repositories over the document store, one per collection.

pub mod baby_repository;
pub mod event_repository;
pub mod family_repository;
pub mod user_repository;

pub use baby_repository::BabyRepository;
pub use event_repository::EventRepository;
pub use family_repository::FamilyRepository;
pub use user_repository::{StoredUser, UserRepository};
