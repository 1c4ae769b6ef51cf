//! Conversion of in-progress event forms into validated events.
//!
//! Every rule here is local and synchronous: a form that fails validation
//! never reaches storage.

use chrono::{DateTime, Utc};
use log::debug;
use shared::{
    DiaperDetails, DiaperForm, DrugType, DrugsDetails, DrugsForm, Event, EventDetails, EventForm,
    EventFormState, FeedType, FeedingDetails, FeedingForm, GrowthDetails, GrowthForm,
    PumpingDetails, PumpingForm, SleepDetails, SleepForm,
};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormValidationError {
    #[error("Baby id cannot be empty")]
    MissingBabyId,
    #[error("Dirty or mixed diapers need a poop color or consistency")]
    MissingStoolDetails,
    #[error("Sleep needs a start time")]
    MissingSleepBegin,
    #[error("Sleep is still in progress; set an end time before saving")]
    SleepInProgress,
    #[error("Sleep cannot end before it begins")]
    SleepEndsBeforeBegin,
    #[error("Breast milk feedings need a duration or side, or an amount")]
    IncompleteBreastFeeding,
    #[error("Formula feedings need an amount")]
    MissingFormulaAmount,
    #[error("Solid feedings need notes or an amount")]
    IncompleteSolidFeeding,
    #[error("Enter at least one of weight, height or head circumference")]
    EmptyGrowth,
    #[error("Pumping needs an amount or a duration")]
    EmptyPumping,
    #[error("Drug dosage is required")]
    MissingDosage,
    #[error("Custom drug name cannot be empty")]
    EmptyDrugName,
    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

/// Validates event forms and builds editing forms from stored events
#[derive(Clone, Default)]
pub struct EventFormService;

impl EventFormService {
    pub fn new() -> Self {
        Self
    }

    /// Produce the event described by `state` for `baby_id`.
    ///
    /// A missing `event_id` gets a fresh id and a missing timestamp becomes
    /// `now`. Sleep events take their timestamp from the begin time.
    pub fn validate(
        &self,
        state: &EventFormState,
        baby_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Event, FormValidationError> {
        if baby_id.trim().is_empty() {
            return Err(FormValidationError::MissingBabyId);
        }
        let notes = non_blank(state.notes.as_deref());
        let mut timestamp = state.timestamp.unwrap_or(now);

        let details = match &state.form {
            EventForm::Diaper(form) => EventDetails::Diaper(self.validate_diaper(form)?),
            EventForm::Feeding(form) => {
                EventDetails::Feeding(self.validate_feeding(form, notes.is_some())?)
            }
            EventForm::Sleep(form) => {
                let (begin, sleep) = self.validate_sleep(form)?;
                timestamp = begin;
                EventDetails::Sleep(sleep)
            }
            EventForm::Growth(form) => EventDetails::Growth(self.validate_growth(form)?),
            EventForm::Pumping(form) => EventDetails::Pumping(self.validate_pumping(form)?),
            EventForm::Drugs(form) => EventDetails::Drugs(self.validate_drugs(form)?),
        };

        let id = state.event_id.clone().unwrap_or_else(Event::generate_id);
        debug!("Validated {} form for event {}", details.kind(), id);

        Ok(Event {
            id,
            baby_id: baby_id.to_string(),
            timestamp,
            notes,
            photo_url: state.photo_url.clone(),
            details,
        })
    }

    /// Editing form pre-filled from an existing event
    pub fn from_event(&self, event: &Event) -> EventFormState {
        let form = match &event.details {
            EventDetails::Diaper(diaper) => EventForm::Diaper(DiaperForm {
                diaper_type: diaper.diaper_type,
                poop_color: diaper.poop_color,
                poop_consistency: diaper.poop_consistency,
            }),
            EventDetails::Feeding(feeding) => EventForm::Feeding(FeedingForm {
                feed_type: feeding.feed_type,
                amount_ml: feeding.amount_ml,
                duration_minutes: feeding.duration_minutes,
                breast_side: feeding.breast_side,
            }),
            EventDetails::Sleep(sleep) => EventForm::Sleep(SleepForm {
                begin_time: sleep.begin_time.or(Some(event.timestamp)),
                end_time: sleep.end_time,
            }),
            EventDetails::Growth(growth) => EventForm::Growth(GrowthForm {
                weight_kg: growth.weight_kg,
                height_cm: growth.height_cm,
                head_circumference_cm: growth.head_circumference_cm,
            }),
            EventDetails::Pumping(pumping) => EventForm::Pumping(PumpingForm {
                amount_ml: pumping.amount_ml,
                duration_minutes: pumping.duration_minutes,
                breast_side: pumping.breast_side,
            }),
            EventDetails::Drugs(drugs) => EventForm::Drugs(DrugsForm {
                drug_type: drugs.drug_type.clone(),
                dosage: drugs.dosage,
                unit: drugs.unit.clone(),
            }),
        };

        EventFormState {
            event_id: Some(event.id.clone()),
            timestamp: Some(event.timestamp),
            notes: event.notes.clone(),
            photo_url: event.photo_url.clone(),
            form,
        }
    }

    fn validate_diaper(&self, form: &DiaperForm) -> Result<DiaperDetails, FormValidationError> {
        if form.diaper_type.has_stool() && form.poop_color.is_none() && form.poop_consistency.is_none() {
            return Err(FormValidationError::MissingStoolDetails);
        }
        Ok(DiaperDetails {
            diaper_type: form.diaper_type,
            poop_color: form.poop_color,
            poop_consistency: form.poop_consistency,
        })
    }

    fn validate_feeding(
        &self,
        form: &FeedingForm,
        has_notes: bool,
    ) -> Result<FeedingDetails, FormValidationError> {
        positive_f64(form.amount_ml, "Amount")?;
        positive_i32(form.duration_minutes, "Duration")?;

        let has_amount = form.amount_ml.is_some();
        match form.feed_type {
            FeedType::BreastMilk => {
                if !(form.duration_minutes.is_some() || form.breast_side.is_some() || has_amount) {
                    return Err(FormValidationError::IncompleteBreastFeeding);
                }
            }
            FeedType::Formula => {
                if !has_amount {
                    return Err(FormValidationError::MissingFormulaAmount);
                }
            }
            FeedType::Solid => {
                if !(has_notes || has_amount) {
                    return Err(FormValidationError::IncompleteSolidFeeding);
                }
            }
        }

        Ok(FeedingDetails {
            feed_type: form.feed_type,
            amount_ml: form.amount_ml,
            duration_minutes: form.duration_minutes,
            breast_side: form.breast_side,
        })
    }

    fn validate_sleep(
        &self,
        form: &SleepForm,
    ) -> Result<(DateTime<Utc>, SleepDetails), FormValidationError> {
        let begin = form.begin_time.ok_or(FormValidationError::MissingSleepBegin)?;
        let end = form.end_time.ok_or(FormValidationError::SleepInProgress)?;
        if end < begin {
            return Err(FormValidationError::SleepEndsBeforeBegin);
        }
        Ok((
            begin,
            SleepDetails {
                is_sleeping: false,
                begin_time: Some(begin),
                end_time: Some(end),
                duration_minutes: Some((end - begin).num_minutes()),
            },
        ))
    }

    fn validate_growth(&self, form: &GrowthForm) -> Result<GrowthDetails, FormValidationError> {
        positive_f64(form.weight_kg, "Weight")?;
        positive_f64(form.height_cm, "Height")?;
        positive_f64(form.head_circumference_cm, "Head circumference")?;
        if form.weight_kg.is_none() && form.height_cm.is_none() && form.head_circumference_cm.is_none() {
            return Err(FormValidationError::EmptyGrowth);
        }
        Ok(GrowthDetails {
            weight_kg: form.weight_kg,
            height_cm: form.height_cm,
            head_circumference_cm: form.head_circumference_cm,
        })
    }

    fn validate_pumping(&self, form: &PumpingForm) -> Result<PumpingDetails, FormValidationError> {
        positive_f64(form.amount_ml, "Amount")?;
        positive_i32(form.duration_minutes, "Duration")?;
        if form.amount_ml.is_none() && form.duration_minutes.is_none() {
            return Err(FormValidationError::EmptyPumping);
        }
        Ok(PumpingDetails {
            amount_ml: form.amount_ml,
            duration_minutes: form.duration_minutes,
            breast_side: form.breast_side,
        })
    }

    fn validate_drugs(&self, form: &DrugsForm) -> Result<DrugsDetails, FormValidationError> {
        let drug_type = match &form.drug_type {
            DrugType::Custom(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(FormValidationError::EmptyDrugName);
                }
                DrugType::from_name(name)
            }
            built_in => built_in.clone(),
        };
        let dosage = form.dosage.ok_or(FormValidationError::MissingDosage)?;
        positive_f64(Some(dosage), "Dosage")?;

        Ok(DrugsDetails {
            drug_type,
            dosage: Some(dosage),
            unit: form.unit.trim().to_string(),
        })
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn positive_f64(value: Option<f64>, field: &'static str) -> Result<(), FormValidationError> {
    match value {
        Some(value) if !(value.is_finite() && value > 0.0) => Err(FormValidationError::NotPositive(field)),
        _ => Ok(()),
    }
}

fn positive_i32(value: Option<i32>, field: &'static str) -> Result<(), FormValidationError> {
    match value {
        Some(value) if value <= 0 => Err(FormValidationError::NotPositive(field)),
        _ => Ok(()),
    }
}
