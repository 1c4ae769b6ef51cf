//! Loggable baby events.
//!
//! An [`Event`] carries the fields every activity has in common and an
//! [`EventDetails`] payload holding exactly one concrete variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

stored_enum! {
    /// Discriminator of the concrete event variant
    EventKind {
        Diaper => "DIAPER",
        Feeding => "FEEDING",
        Sleep => "SLEEP",
        Growth => "GROWTH",
        Pumping => "PUMPING",
        Drugs => "DRUGS",
    }
}

stored_enum! {
    DiaperType {
        Wet => "WET",
        Dirty => "DIRTY",
        Mixed => "MIXED",
        Dry => "DRY",
    }
}

stored_enum! {
    PoopColor {
        Yellow => "YELLOW",
        Brown => "BROWN",
        Green => "GREEN",
        Orange => "ORANGE",
        Black => "BLACK",
        Red => "RED",
        White => "WHITE",
    }
}

stored_enum! {
    PoopConsistency {
        Liquid => "LIQUID",
        Runny => "RUNNY",
        Mushy => "MUSHY",
        Seedy => "SEEDY",
        Soft => "SOFT",
        Formed => "FORMED",
        Hard => "HARD",
    }
}

stored_enum! {
    FeedType {
        BreastMilk => "BREAST_MILK",
        Formula => "FORMULA",
        Solid => "SOLID",
    }
}

stored_enum! {
    BreastSide {
        Left => "LEFT",
        Right => "RIGHT",
        Both => "BOTH",
    }
}

impl DiaperType {
    /// Dirty and mixed diapers are expected to describe the stool
    pub fn has_stool(&self) -> bool {
        matches!(self, DiaperType::Dirty | DiaperType::Mixed)
    }
}

/// Medication type: a fixed set of common drugs plus family-defined names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DrugType {
    Paracetamol,
    Ibuprofen,
    VitaminD,
    Iron,
    Antibiotic,
    /// Any other drug. Never holds a built-in name; build it with
    /// [`DrugType::custom`] so `IRON` stays `Iron` through storage.
    Custom(String),
}

impl DrugType {
    pub const BUILT_IN: [DrugType; 5] = [
        DrugType::Paracetamol,
        DrugType::Ibuprofen,
        DrugType::VitaminD,
        DrugType::Iron,
        DrugType::Antibiotic,
    ];

    pub fn name(&self) -> &str {
        match self {
            DrugType::Paracetamol => "PARACETAMOL",
            DrugType::Ibuprofen => "IBUPROFEN",
            DrugType::VitaminD => "VITAMIN_D",
            DrugType::Iron => "IRON",
            DrugType::Antibiotic => "ANTIBIOTIC",
            DrugType::Custom(name) => name,
        }
    }

    /// Any name that is not built in becomes a custom drug type
    pub fn from_name(name: &str) -> Self {
        Self::BUILT_IN
            .iter()
            .find(|built_in| built_in.name() == name)
            .cloned()
            .unwrap_or_else(|| DrugType::Custom(name.to_string()))
    }

    /// Custom drug type, folded onto the built-in type of the same name
    pub fn custom(name: impl Into<String>) -> Self {
        Self::from_name(&name.into())
    }

    pub fn is_built_in_name(name: &str) -> bool {
        Self::BUILT_IN
            .iter()
            .any(|built_in| built_in.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for DrugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for DrugType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DrugType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(DrugType::from_name(&name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaperDetails {
    pub diaper_type: DiaperType,
    pub poop_color: Option<PoopColor>,
    pub poop_consistency: Option<PoopConsistency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingDetails {
    pub feed_type: FeedType,
    pub amount_ml: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub breast_side: Option<BreastSide>,
}

/// A sleep period; `end_time` may fall on a later calendar day than `begin_time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepDetails {
    pub is_sleeping: bool,
    pub begin_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthDetails {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub head_circumference_cm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpingDetails {
    pub amount_ml: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub breast_side: Option<BreastSide>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugsDetails {
    pub drug_type: DrugType,
    pub dosage: Option<f64>,
    pub unit: String,
}

/// Variant payload of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDetails {
    Diaper(DiaperDetails),
    Feeding(FeedingDetails),
    Sleep(SleepDetails),
    Growth(GrowthDetails),
    Pumping(PumpingDetails),
    Drugs(DrugsDetails),
}

impl EventDetails {
    pub fn kind(&self) -> EventKind {
        match self {
            EventDetails::Diaper(_) => EventKind::Diaper,
            EventDetails::Feeding(_) => EventKind::Feeding,
            EventDetails::Sleep(_) => EventKind::Sleep,
            EventDetails::Growth(_) => EventKind::Growth,
            EventDetails::Pumping(_) => EventKind::Pumping,
            EventDetails::Drugs(_) => EventKind::Drugs,
        }
    }
}

/// A single logged activity for one baby.
///
/// `id` and `baby_id` never change once the event has been created; edits
/// replace every other field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub baby_id: String,
    /// Orders events; for sleep this is the moment the baby fell asleep
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl Event {
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn baby_id(&self) -> &str {
        &self.baby_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    pub fn kind(&self) -> EventKind {
        self.details.kind()
    }

    /// End of the period covered by the event, only sleep has one
    pub fn end_boundary(&self) -> Option<DateTime<Utc>> {
        match &self.details {
            EventDetails::Sleep(sleep) => sleep.end_time,
            _ => None,
        }
    }

    /// Quantity in millilitres for feedings and pumping sessions
    pub fn amount_ml(&self) -> Option<f64> {
        match &self.details {
            EventDetails::Feeding(feeding) => feeding.amount_ml,
            EventDetails::Pumping(pumping) => pumping.amount_ml,
            _ => None,
        }
    }

    pub fn with_photo_url(mut self, photo_url: Option<String>) -> Self {
        self.photo_url = photo_url;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sleep_event() -> Event {
        let begin = Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 2, 3, 0, 0).unwrap();
        Event {
            id: "evt-1".to_string(),
            baby_id: "baby-1".to_string(),
            timestamp: begin,
            notes: None,
            photo_url: None,
            details: EventDetails::Sleep(SleepDetails {
                is_sleeping: false,
                begin_time: Some(begin),
                end_time: Some(end),
                duration_minutes: Some(300),
            }),
        }
    }

    #[test]
    fn test_event_kind_names() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(*kind));
        }
        assert_eq!(EventKind::parse("BATH"), None);
        assert_eq!(EventKind::parse("diaper"), None);
    }

    #[test]
    fn test_drug_type_custom_names() {
        assert_eq!(DrugType::from_name("VITAMIN_D"), DrugType::VitaminD);
        assert_eq!(
            DrugType::from_name("Simethicone"),
            DrugType::Custom("Simethicone".to_string())
        );
        assert_eq!(DrugType::custom("IRON"), DrugType::Iron);
        assert_eq!(DrugType::custom("Gripe water"), DrugType::Custom("Gripe water".to_string()));
        assert!(DrugType::is_built_in_name("ibuprofen"));
        assert!(!DrugType::is_built_in_name("Simethicone"));
    }

    #[test]
    fn test_end_boundary_only_for_sleep() {
        let sleep = sleep_event();
        assert_eq!(
            sleep.end_boundary(),
            Some(Utc.with_ymd_and_hms(2025, 3, 2, 3, 0, 0).unwrap())
        );

        let diaper = Event {
            details: EventDetails::Diaper(DiaperDetails {
                diaper_type: DiaperType::Wet,
                poop_color: None,
                poop_consistency: None,
            }),
            ..sleep
        };
        assert_eq!(diaper.end_boundary(), None);
        assert_eq!(diaper.kind(), EventKind::Diaper);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = sleep_event();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "SLEEP");
        assert_eq!(json["baby_id"], "baby-1");
        assert_eq!(event.id(), "evt-1");
        assert_eq!(event.baby_id(), "baby-1");
        assert_eq!(event.notes(), None);
        assert_eq!(event.photo_url(), None);
        assert_eq!(event.timestamp(), event.timestamp);

        let parsed: Event = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }
}
