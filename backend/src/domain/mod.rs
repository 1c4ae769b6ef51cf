//! # Domain Layer
//!
//! Business rules of the baby tracker. Services own the access policy, input
//! validation and the derived views (day lists, calendar months, amount
//! presets); persistence is delegated to the storage repositories.

pub mod auth_service;
pub mod baby_service;
pub mod calendar;
pub mod errors;
pub mod event_service;
pub mod family_service;
pub mod forms;
pub mod presets;
pub mod settings_service;

pub use auth_service::{AuthError, AuthProvider, LocalAuthProvider};
pub use baby_service::BabyService;
pub use calendar::CalendarService;
pub use errors::DomainError;
pub use event_service::{EventQuery, EventService};
pub use family_service::FamilyService;
pub use forms::{EventFormService, FormValidationError};
pub use presets::{AmountSample, PresetService};
pub use settings_service::{FileConfigSource, RemoteConfigSource, SettingsService};
