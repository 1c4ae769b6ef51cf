//! Editable mirrors of each event variant.
//!
//! A form holds whatever the user has entered so far, which may not yet be a
//! valid event. Turning a form into an [`Event`](crate::Event) is the job of
//! the backend's form validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{BreastSide, DiaperType, DrugType, EventKind, FeedType, PoopColor, PoopConsistency};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaperForm {
    pub diaper_type: DiaperType,
    pub poop_color: Option<PoopColor>,
    pub poop_consistency: Option<PoopConsistency>,
}

impl Default for DiaperForm {
    fn default() -> Self {
        Self {
            diaper_type: DiaperType::Wet,
            poop_color: None,
            poop_consistency: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedingForm {
    pub feed_type: FeedType,
    pub amount_ml: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub breast_side: Option<BreastSide>,
}

impl Default for FeedingForm {
    fn default() -> Self {
        Self {
            feed_type: FeedType::BreastMilk,
            amount_ml: None,
            duration_minutes: None,
            breast_side: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepForm {
    pub begin_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SleepForm {
    /// Started but not yet finished; such a sleep cannot be saved
    pub fn is_in_progress(&self) -> bool {
        self.begin_time.is_some() && self.end_time.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthForm {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub head_circumference_cm: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpingForm {
    pub amount_ml: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub breast_side: Option<BreastSide>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrugsForm {
    pub drug_type: DrugType,
    pub dosage: Option<f64>,
    pub unit: String,
}

impl Default for DrugsForm {
    fn default() -> Self {
        Self {
            drug_type: DrugType::Paracetamol,
            dosage: None,
            unit: "mg".to_string(),
        }
    }
}

/// Variant-specific part of a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventForm {
    Diaper(DiaperForm),
    Feeding(FeedingForm),
    Sleep(SleepForm),
    Growth(GrowthForm),
    Pumping(PumpingForm),
    Drugs(DrugsForm),
}

impl EventForm {
    pub fn kind(&self) -> EventKind {
        match self {
            EventForm::Diaper(_) => EventKind::Diaper,
            EventForm::Feeding(_) => EventKind::Feeding,
            EventForm::Sleep(_) => EventKind::Sleep,
            EventForm::Growth(_) => EventKind::Growth,
            EventForm::Pumping(_) => EventKind::Pumping,
            EventForm::Drugs(_) => EventKind::Drugs,
        }
    }
}

/// In-progress state of an event being created or edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFormState {
    /// Set when editing an existing event
    #[serde(default)]
    pub event_id: Option<String>,
    /// Defaults to the moment of saving when left empty
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub form: EventForm,
}

impl EventFormState {
    /// Blank form for a new event of the given kind
    pub fn new(kind: EventKind) -> Self {
        let form = match kind {
            EventKind::Diaper => EventForm::Diaper(DiaperForm::default()),
            EventKind::Feeding => EventForm::Feeding(FeedingForm::default()),
            EventKind::Sleep => EventForm::Sleep(SleepForm::default()),
            EventKind::Growth => EventForm::Growth(GrowthForm::default()),
            EventKind::Pumping => EventForm::Pumping(PumpingForm::default()),
            EventKind::Drugs => EventForm::Drugs(DrugsForm::default()),
        };
        Self {
            event_id: None,
            timestamp: None,
            notes: None,
            photo_url: None,
            form,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.form.kind()
    }

    pub fn is_editing(&self) -> bool {
        self.event_id.is_some()
    }
}
