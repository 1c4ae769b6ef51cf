use chrono::NaiveDate;
use log::warn;
use shared::{Baby, BloodType, Gender, Pediatrician};

use crate::storage::document::Document;

pub const PARENT_IDS: &str = "parentIds";
const ID: &str = "id";
const NAME: &str = "name";
const BIRTH_DATE: &str = "birthDate";
const GENDER: &str = "gender";
const BIRTH_WEIGHT_KG: &str = "birthWeightKg";
const BIRTH_LENGTH_CM: &str = "birthLengthCm";
const BIRTH_HEAD_CIRCUMFERENCE_CM: &str = "birthHeadCircumferenceCm";
const BLOOD_TYPE: &str = "bloodType";
const ALLERGIES: &str = "allergies";
const MEDICAL_CONDITIONS: &str = "medicalConditions";
const PEDIATRICIAN_NAME: &str = "pediatricianName";
const PEDIATRICIAN_PHONE: &str = "pediatricianPhone";
const NOTES: &str = "notes";
const PHOTO_URL: &str = "photoUrl";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Mapper converting between baby profiles and stored documents
pub struct BabyMapper;

impl BabyMapper {
    pub fn to_document(baby: &Baby) -> Document {
        let mut document = Document::new(baby.id.clone());
        document
            .set(ID, baby.id.as_str())
            .set(NAME, baby.name.as_str())
            .set(BIRTH_DATE, baby.birth_date.format(DATE_FORMAT).to_string())
            .set(GENDER, baby.gender.as_str())
            .set(BIRTH_WEIGHT_KG, baby.birth_weight_kg)
            .set(BIRTH_LENGTH_CM, baby.birth_length_cm)
            .set(BIRTH_HEAD_CIRCUMFERENCE_CM, baby.birth_head_circumference_cm)
            .set(BLOOD_TYPE, baby.blood_type.as_str())
            .set(ALLERGIES, baby.allergies.clone())
            .set(MEDICAL_CONDITIONS, baby.medical_conditions.clone())
            .set(PEDIATRICIAN_NAME, baby.pediatrician.as_ref().map(|p| p.name.clone()))
            .set(PEDIATRICIAN_PHONE, baby.pediatrician.as_ref().and_then(|p| p.phone.clone()))
            .set(NOTES, baby.notes.clone())
            .set(PHOTO_URL, baby.photo_url.clone())
            .set(PARENT_IDS, baby.parent_ids.clone())
            .set(CREATED_AT, baby.created_at)
            .set(UPDATED_AT, baby.updated_at);
        document
    }

    /// `None` (with a warning) when a required field is missing or malformed
    pub fn from_document(document: &Document) -> Option<Baby> {
        let birth_date = document
            .get_str(BIRTH_DATE)
            .and_then(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).ok());
        let (Some(name), Some(birth_date), Some(created_at), Some(updated_at)) = (
            document.get_string(NAME),
            birth_date,
            document.get_timestamp(CREATED_AT),
            document.get_timestamp(UPDATED_AT),
        ) else {
            warn!("Dropping baby {}: missing or malformed required fields", document.id);
            return None;
        };

        Some(Baby {
            id: document.id.clone(),
            name,
            birth_date,
            gender: document
                .get_str(GENDER)
                .and_then(Gender::parse)
                .unwrap_or(Gender::Other),
            birth_weight_kg: document.get_f64(BIRTH_WEIGHT_KG),
            birth_length_cm: document.get_f64(BIRTH_LENGTH_CM),
            birth_head_circumference_cm: document.get_f64(BIRTH_HEAD_CIRCUMFERENCE_CM),
            blood_type: document
                .get_str(BLOOD_TYPE)
                .and_then(BloodType::parse)
                .unwrap_or_default(),
            allergies: document.get_string_list(ALLERGIES),
            medical_conditions: document.get_string_list(MEDICAL_CONDITIONS),
            pediatrician: document.get_string(PEDIATRICIAN_NAME).map(|name| Pediatrician {
                name,
                phone: document.get_string(PEDIATRICIAN_PHONE),
            }),
            notes: document.get_string(NOTES),
            photo_url: document.get_string(PHOTO_URL),
            parent_ids: document.get_string_list(PARENT_IDS),
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_round_trip() {
        let created = Utc.with_ymd_and_hms(2025, 1, 11, 9, 0, 0).unwrap();
        let baby = Baby {
            id: "baby-1".to_string(),
            name: "Ada".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            gender: Gender::Female,
            birth_weight_kg: Some(3.4),
            birth_length_cm: Some(50.5),
            birth_head_circumference_cm: None,
            blood_type: BloodType::ONegative,
            allergies: vec!["peanuts".to_string()],
            medical_conditions: Vec::new(),
            pediatrician: Some(Pediatrician {
                name: "Dr. Snow".to_string(),
                phone: None,
            }),
            notes: None,
            photo_url: None,
            parent_ids: vec!["user-1".to_string(), "user-2".to_string()],
            created_at: created,
            updated_at: created,
        };

        let document = BabyMapper::to_document(&baby);
        assert_eq!(document.get_str(BIRTH_DATE), Some("2025-01-10"));
        assert_eq!(BabyMapper::from_document(&document), Some(baby));
    }

    #[test]
    fn test_malformed_birth_date_is_dropped() {
        let mut document = Document::new("baby-1");
        document
            .set(NAME, "Ada")
            .set(BIRTH_DATE, "10/01/2025")
            .set(CREATED_AT, Utc::now())
            .set(UPDATED_AT, Utc::now());
        assert_eq!(BabyMapper::from_document(&document), None);
    }
}
