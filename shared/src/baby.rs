use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

stored_enum! {
    Gender {
        Male => "MALE",
        Female => "FEMALE",
        Other => "OTHER",
    }
}

stored_enum! {
    BloodType {
        APositive => "A_POSITIVE",
        ANegative => "A_NEGATIVE",
        BPositive => "B_POSITIVE",
        BNegative => "B_NEGATIVE",
        AbPositive => "AB_POSITIVE",
        AbNegative => "AB_NEGATIVE",
        OPositive => "O_POSITIVE",
        ONegative => "O_NEGATIVE",
        Unknown => "UNKNOWN",
    }
}

impl Default for BloodType {
    fn default() -> Self {
        BloodType::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pediatrician {
    pub name: String,
    pub phone: Option<String>,
}

/// A baby profile. Parents listed in `parent_ids` own the profile and its events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baby {
    pub id: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub birth_weight_kg: Option<f64>,
    pub birth_length_cm: Option<f64>,
    pub birth_head_circumference_cm: Option<f64>,
    pub blood_type: BloodType,
    pub allergies: Vec<String>,
    pub medical_conditions: Vec<String>,
    pub pediatrician: Option<Pediatrician>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub parent_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Baby {
    /// Minimal profile; every optional field empty, no parents yet
    pub fn new(id: String, name: String, birth_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            birth_date,
            gender: Gender::Other,
            birth_weight_kg: None,
            birth_length_cm: None,
            birth_head_circumference_cm: None,
            blood_type: BloodType::default(),
            allergies: Vec::new(),
            medical_conditions: Vec::new(),
            pediatrician: None,
            notes: None,
            photo_url: None,
            parent_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn is_parent(&self, user_id: &str) -> bool {
        self.parent_ids.iter().any(|id| id == user_id)
    }

    /// Adds a parent, keeping the list free of duplicates
    pub fn add_parent(&mut self, user_id: &str) -> bool {
        if self.is_parent(user_id) {
            return false;
        }
        self.parent_ids.push(user_id.to_string());
        true
    }

    pub fn age_in_days(&self, today: NaiveDate) -> i64 {
        (today - self.birth_date).num_days()
    }
}
