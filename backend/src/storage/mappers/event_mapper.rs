//! Event <-> flat document mapping.
//!
//! Each variant lists its fields explicitly. The field names below are the
//! stored contract; renaming one orphans every existing record.

use log::warn;
use shared::{
    BreastSide, DiaperDetails, DiaperType, DrugType, DrugsDetails, Event, EventDetails, EventKind,
    FeedType, FeedingDetails, GrowthDetails, PoopColor, PoopConsistency, PumpingDetails,
    SleepDetails,
};

use crate::storage::document::Document;

pub const EVENT_TYPE: &str = "eventType";
pub const BABY_ID: &str = "babyId";
pub const TIMESTAMP: &str = "timestamp";
const ID: &str = "id";
const NOTES: &str = "notes";
const PHOTO_URL: &str = "photoUrl";
const DIAPER_TYPE: &str = "diaperType";
const POOP_COLOR: &str = "poopColor";
const POOP_CONSISTENCY: &str = "poopConsistency";
pub const FEED_TYPE: &str = "feedType";
const AMOUNT_ML: &str = "amountMl";
const DURATION_MINUTES: &str = "durationMinutes";
const BREAST_SIDE: &str = "breastSide";
const IS_SLEEPING: &str = "isSleeping";
const BEGIN_TIME: &str = "beginTime";
const END_TIME: &str = "endTime";
const WEIGHT_KG: &str = "weightKg";
const HEIGHT_CM: &str = "heightCm";
const HEAD_CIRCUMFERENCE_CM: &str = "headCircumferenceCm";
const DRUG_TYPE: &str = "drugType";
const DOSAGE: &str = "dosage";
const UNIT: &str = "unit";

/// Mapper converting between domain events and stored documents
pub struct EventMapper;

impl EventMapper {
    /// Flatten an event into its stored field map plus discriminator
    pub fn to_document(event: &Event) -> Document {
        let mut document = Document::new(event.id.clone());
        document
            .set(ID, event.id.as_str())
            .set(EVENT_TYPE, event.kind().as_str())
            .set(BABY_ID, event.baby_id.as_str())
            .set(TIMESTAMP, event.timestamp)
            .set(NOTES, event.notes.clone())
            .set(PHOTO_URL, event.photo_url.clone());

        match &event.details {
            EventDetails::Diaper(diaper) => {
                document
                    .set(DIAPER_TYPE, diaper.diaper_type.as_str())
                    .set(POOP_COLOR, diaper.poop_color.map(|c| c.as_str()))
                    .set(POOP_CONSISTENCY, diaper.poop_consistency.map(|c| c.as_str()));
            }
            EventDetails::Feeding(feeding) => {
                document
                    .set(FEED_TYPE, feeding.feed_type.as_str())
                    .set(AMOUNT_ML, feeding.amount_ml)
                    .set(DURATION_MINUTES, feeding.duration_minutes)
                    .set(BREAST_SIDE, feeding.breast_side.map(|s| s.as_str()));
            }
            EventDetails::Sleep(sleep) => {
                document
                    .set(IS_SLEEPING, sleep.is_sleeping)
                    .set(BEGIN_TIME, sleep.begin_time)
                    .set(END_TIME, sleep.end_time)
                    .set(DURATION_MINUTES, sleep.duration_minutes);
            }
            EventDetails::Growth(growth) => {
                document
                    .set(WEIGHT_KG, growth.weight_kg)
                    .set(HEIGHT_CM, growth.height_cm)
                    .set(HEAD_CIRCUMFERENCE_CM, growth.head_circumference_cm);
            }
            EventDetails::Pumping(pumping) => {
                document
                    .set(AMOUNT_ML, pumping.amount_ml)
                    .set(DURATION_MINUTES, pumping.duration_minutes)
                    .set(BREAST_SIDE, pumping.breast_side.map(|s| s.as_str()));
            }
            EventDetails::Drugs(drugs) => {
                document
                    .set(DRUG_TYPE, drugs.drug_type.name())
                    .set(DOSAGE, drugs.dosage)
                    .set(UNIT, drugs.unit.as_str());
            }
        }
        document
    }

    /// Rebuild the concrete event from a stored document.
    ///
    /// Unknown discriminators and records missing a required field are
    /// logged and yield `None` rather than an error, so one bad record never
    /// breaks a listing.
    pub fn from_document(document: &Document) -> Option<Event> {
        let Some(type_name) = document.get_str(EVENT_TYPE) else {
            warn!("Dropping event {}: missing {}", document.id, EVENT_TYPE);
            return None;
        };
        let Some(kind) = EventKind::parse(type_name) else {
            warn!("Dropping event {}: unknown event type {:?}", document.id, type_name);
            return None;
        };

        let details = match kind {
            EventKind::Diaper => EventDetails::Diaper(DiaperDetails {
                diaper_type: Self::required_enum(document, DIAPER_TYPE, DiaperType::parse)?,
                poop_color: Self::optional_enum(document, POOP_COLOR, PoopColor::parse),
                poop_consistency: Self::optional_enum(document, POOP_CONSISTENCY, PoopConsistency::parse),
            }),
            EventKind::Feeding => EventDetails::Feeding(FeedingDetails {
                feed_type: Self::required_enum(document, FEED_TYPE, FeedType::parse)?,
                amount_ml: document.get_f64(AMOUNT_ML),
                duration_minutes: document.get_i32(DURATION_MINUTES),
                breast_side: Self::optional_enum(document, BREAST_SIDE, BreastSide::parse),
            }),
            EventKind::Sleep => EventDetails::Sleep(SleepDetails {
                is_sleeping: document.get_bool(IS_SLEEPING).unwrap_or(false),
                begin_time: document.get_timestamp(BEGIN_TIME),
                end_time: document.get_timestamp(END_TIME),
                duration_minutes: document.get_i64(DURATION_MINUTES),
            }),
            EventKind::Growth => EventDetails::Growth(GrowthDetails {
                weight_kg: document.get_f64(WEIGHT_KG),
                height_cm: document.get_f64(HEIGHT_CM),
                head_circumference_cm: document.get_f64(HEAD_CIRCUMFERENCE_CM),
            }),
            EventKind::Pumping => EventDetails::Pumping(PumpingDetails {
                amount_ml: document.get_f64(AMOUNT_ML),
                duration_minutes: document.get_i32(DURATION_MINUTES),
                breast_side: Self::optional_enum(document, BREAST_SIDE, BreastSide::parse),
            }),
            EventKind::Drugs => EventDetails::Drugs(DrugsDetails {
                drug_type: DrugType::from_name(Self::required_str(document, DRUG_TYPE)?),
                dosage: document.get_f64(DOSAGE),
                unit: document.get_string(UNIT).unwrap_or_default(),
            }),
        };

        Some(Event {
            id: document.id.clone(),
            baby_id: Self::required_str(document, BABY_ID)?.to_string(),
            timestamp: match document.get_timestamp(TIMESTAMP) {
                Some(timestamp) => timestamp,
                None => {
                    warn!("Dropping event {}: missing {}", document.id, TIMESTAMP);
                    return None;
                }
            },
            notes: document.get_string(NOTES),
            photo_url: document.get_string(PHOTO_URL),
            details,
        })
    }

    fn required_str<'a>(document: &'a Document, field: &str) -> Option<&'a str> {
        let value = document.get_str(field);
        if value.is_none() {
            warn!("Dropping event {}: missing {}", document.id, field);
        }
        value
    }

    fn required_enum<T>(document: &Document, field: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
        let name = Self::required_str(document, field)?;
        let value = parse(name);
        if value.is_none() {
            warn!("Dropping event {}: unknown {} {:?}", document.id, field, name);
        }
        value
    }

    /// Unrecognized optional values degrade to `None` instead of dropping the event
    fn optional_enum<T>(document: &Document, field: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
        let name = document.get_str(field)?;
        let value = parse(name);
        if value.is_none() {
            warn!("Ignoring unknown {} {:?} on event {}", field, name, document.id);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::document::FieldValue;
    use chrono::{TimeZone, Utc};

    fn base_event(details: EventDetails) -> Event {
        Event {
            id: "evt-1".to_string(),
            baby_id: "baby-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 4, 2, 8, 30, 0).unwrap(),
            notes: Some("after bath".to_string()),
            photo_url: None,
            details,
        }
    }

    fn every_variant() -> Vec<Event> {
        let begin = Utc.with_ymd_and_hms(2025, 4, 1, 22, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 4, 2, 3, 15, 0).unwrap();
        vec![
            base_event(EventDetails::Diaper(DiaperDetails {
                diaper_type: DiaperType::Mixed,
                poop_color: Some(PoopColor::Yellow),
                poop_consistency: None,
            })),
            base_event(EventDetails::Feeding(FeedingDetails {
                feed_type: FeedType::BreastMilk,
                amount_ml: None,
                duration_minutes: Some(15),
                breast_side: Some(BreastSide::Left),
            })),
            base_event(EventDetails::Sleep(SleepDetails {
                is_sleeping: false,
                begin_time: Some(begin),
                end_time: Some(end),
                duration_minutes: Some(315),
            })),
            base_event(EventDetails::Growth(GrowthDetails {
                weight_kg: Some(5.25),
                height_cm: None,
                head_circumference_cm: Some(38.0),
            })),
            base_event(EventDetails::Pumping(PumpingDetails {
                amount_ml: Some(85.0),
                duration_minutes: None,
                breast_side: Some(BreastSide::Both),
            })),
            base_event(EventDetails::Drugs(DrugsDetails {
                drug_type: DrugType::Custom("Simethicone".to_string()),
                dosage: Some(20.0),
                unit: "mg".to_string(),
            }))
            .with_photo_url(Some("file:///photos/events/evt-1.jpg".to_string())),
            base_event(EventDetails::Drugs(DrugsDetails {
                drug_type: DrugType::custom("IRON"),
                dosage: Some(1.5),
                unit: "ml".to_string(),
            })),
        ]
    }

    #[test]
    fn test_round_trip_every_variant() {
        for event in every_variant() {
            let document = EventMapper::to_document(&event);
            assert_eq!(EventMapper::from_document(&document), Some(event));
        }
    }

    #[test]
    fn test_document_layout() {
        let events = every_variant();
        let feeding = EventMapper::to_document(&events[1]);
        assert_eq!(feeding.get_str(EVENT_TYPE), Some("FEEDING"));
        assert_eq!(feeding.get_str(FEED_TYPE), Some("BREAST_MILK"));
        assert_eq!(feeding.get_str(BREAST_SIDE), Some("LEFT"));
        assert_eq!(feeding.fields.get(AMOUNT_ML), Some(&FieldValue::Null));
        assert!(matches!(feeding.fields.get(TIMESTAMP), Some(FieldValue::Timestamp(_))));
        assert_eq!(feeding.get_str(BABY_ID), Some("baby-1"));
    }

    #[test]
    fn test_unknown_discriminator_is_dropped() {
        let mut document = EventMapper::to_document(&every_variant()[0]);
        document.set(EVENT_TYPE, "BATH");
        assert_eq!(EventMapper::from_document(&document), None);

        document.fields.remove(EVENT_TYPE);
        assert_eq!(EventMapper::from_document(&document), None);
    }

    #[test]
    fn test_missing_required_fields_are_dropped() {
        let mut document = EventMapper::to_document(&every_variant()[0]);
        document.set(DIAPER_TYPE, "SOAKED");
        assert_eq!(EventMapper::from_document(&document), None);

        let mut document = EventMapper::to_document(&every_variant()[1]);
        document.fields.remove(TIMESTAMP);
        assert_eq!(EventMapper::from_document(&document), None);
    }

    #[test]
    fn test_unknown_optional_value_degrades_to_none() {
        let mut document = EventMapper::to_document(&every_variant()[0]);
        document.set(POOP_COLOR, "PURPLE");
        let event = EventMapper::from_document(&document).unwrap();
        match event.details {
            EventDetails::Diaper(diaper) => assert_eq!(diaper.poop_color, None),
            other => panic!("unexpected details {:?}", other),
        }
    }
}
