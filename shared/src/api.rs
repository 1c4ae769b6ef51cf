//! Request and response types of the REST API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::baby::{Baby, BloodType, Gender, Pediatrician};
use crate::events::{Event, EventKind};
use crate::family::{Family, FamilySettings};
use crate::forms::EventFormState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBabyRequest {
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub birth_weight_kg: Option<f64>,
    #[serde(default)]
    pub birth_length_cm: Option<f64>,
    #[serde(default)]
    pub birth_head_circumference_cm: Option<f64>,
    #[serde(default)]
    pub blood_type: BloodType,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub pediatrician: Option<Pediatrician>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateBabyRequest {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub birth_weight_kg: Option<f64>,
    pub birth_length_cm: Option<f64>,
    pub birth_head_circumference_cm: Option<f64>,
    pub blood_type: Option<BloodType>,
    pub allergies: Option<Vec<String>>,
    pub medical_conditions: Option<Vec<String>>,
    pub pediatrician: Option<Pediatrician>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BabyResponse {
    pub baby: Baby,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BabyListResponse {
    pub babies: Vec<Baby>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEventRequest {
    pub form: EventFormState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEventResponse {
    pub event: Event,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEventsResponse {
    pub date: NaiveDate,
    pub events: Vec<Event>,
}

/// Type of calendar day for explicit rendering logic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CalendarDayType {
    /// Empty padding day before the start of the month
    PaddingBefore,
    /// Actual day within the month
    MonthDay,
    /// Empty padding day after the end of the month
    PaddingAfter,
}

/// A single day cell of the calendar view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarDay {
    pub day: u32,
    pub day_type: CalendarDayType,
    pub event_counts: BTreeMap<EventKind, u32>,
    /// Minutes of sleep falling within this day
    pub sleep_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarMonth {
    pub month: u32,
    pub year: i32,
    pub days: Vec<CalendarDay>,
    pub first_day_of_week: u32, // 0 = Sunday, 1 = Monday, etc.
}

/// Which method produced a preset list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresetSource {
    Default,
    SingleSample,
    GrowthRate,
    Average,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetResponse {
    pub presets: Vec<f64>,
    pub source: PresetSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFamilyRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinFamilyRequest {
    pub invite_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyBabyRequest {
    pub baby_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateFamilySettingsRequest {
    pub settings: FamilySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddCustomDrugTypeRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyResponse {
    pub family: Family,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyListResponse {
    pub families: Vec<Family>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// A signed-up user as exposed outside the auth provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Option<UserAccount>,
}
