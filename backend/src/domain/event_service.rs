use anyhow::{Context, Result};
use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use log::{info, warn};
use shared::{Baby, CalendarMonth, Event, EventFormState, EventKind, FeedType, PresetResponse};
use std::sync::Arc;

use crate::domain::calendar::CalendarService;
use crate::domain::errors::DomainError;
use crate::domain::forms::EventFormService;
use crate::domain::presets::{AmountSample, PresetService, WINDOW_SIZE};
use crate::domain::settings_service::SettingsService;
use crate::storage::{BabyRepository, BlobStore, DocumentStore, EventRepository, FamilyRepository};

pub const EVENT_PHOTO_TYPE: &str = "events";

/// How far back to look for events whose span reaches into a requested range
const SPAN_LOOKBACK_DAYS: u64 = 7;

/// Filters for listing events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    /// Empty means every kind the caller may read
    pub kinds: Vec<EventKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// What a user may see of one baby's events
struct ReadAccess {
    kinds: Vec<EventKind>,
    hide_photos: bool,
}

/// Service for logging and querying baby events
#[derive(Clone)]
pub struct EventService {
    event_repository: EventRepository,
    baby_repository: BabyRepository,
    family_repository: FamilyRepository,
    blobs: Arc<dyn BlobStore>,
    settings: SettingsService,
    forms: EventFormService,
    calendar: CalendarService,
    presets: PresetService,
}

impl EventService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>, settings: SettingsService) -> Self {
        Self {
            event_repository: EventRepository::new(store.clone()),
            baby_repository: BabyRepository::new(store.clone()),
            family_repository: FamilyRepository::new(store),
            blobs,
            settings,
            forms: EventFormService::new(),
            calendar: CalendarService::new(),
            presets: PresetService::new(),
        }
    }

    /// Validate the form and create or replace the event it describes.
    /// The photo reference is never taken from the form; it only changes
    /// through `attach_photo` and `remove_photo`.
    pub async fn save_event(
        &self,
        user_id: &str,
        baby_id: &str,
        form: &EventFormState,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        info!("Saving {} event for baby {}", form.kind(), baby_id);
        self.check_write_access(user_id, baby_id).await?;

        let event = self.forms.validate(form, baby_id, now)?;
        let photo_url = match self.event_repository.get_event(&event.id).await? {
            Some(existing) if existing.baby_id != baby_id => {
                warn!("Event {} belongs to baby {}, not {}", event.id, existing.baby_id, baby_id);
                return Err(DomainError::invalid_input("event belongs to another baby").into());
            }
            Some(existing) => existing.photo_url,
            None => None,
        };
        let event = event.with_photo_url(photo_url);

        self.event_repository.store_event(&event).await?;
        info!("Saved event {}", event.id);
        Ok(event)
    }

    pub async fn get_event(&self, user_id: &str, event_id: &str) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        let access = self.read_access(user_id, &event.baby_id).await?;
        if !access.kinds.contains(&event.kind()) {
            return Err(DomainError::permission_denied(format!("cannot read {} events", event.kind())).into());
        }
        Ok(Self::redact(event, &access))
    }

    /// Editing form for an existing event
    pub async fn edit_form(&self, user_id: &str, event_id: &str) -> Result<EventFormState> {
        let event = self.get_event(user_id, event_id).await?;
        Ok(self.forms.from_event(&event))
    }

    /// Events of a baby, newest first
    pub async fn list_events(&self, user_id: &str, baby_id: &str, query: &EventQuery) -> Result<Vec<Event>> {
        let access = self.read_access(user_id, baby_id).await?;
        let kinds: Vec<EventKind> = if query.kinds.is_empty() {
            access.kinds.clone()
        } else {
            query
                .kinds
                .iter()
                .copied()
                .filter(|kind| access.kinds.contains(kind))
                .collect()
        };
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let events = self
            .event_repository
            .list_events(baby_id, &kinds, query.from, query.to, query.limit)
            .await?;
        Ok(events.into_iter().map(|event| Self::redact(event, &access)).collect())
    }

    pub async fn delete_event(&self, user_id: &str, event_id: &str) -> Result<()> {
        let event = self.load_event(event_id).await?;
        self.check_write_access(user_id, &event.baby_id).await?;

        if event.photo_url.is_some() {
            self.blobs.delete(EVENT_PHOTO_TYPE, &event.id).await?;
        }
        self.event_repository.delete_event(&event.id).await?;
        info!("Deleted event {}", event.id);
        Ok(())
    }

    /// Events occupying one local day, sleeps across midnight included
    pub async fn events_for_day<Tz: TimeZone>(
        &self,
        user_id: &str,
        baby_id: &str,
        date: NaiveDate,
        tz: &Tz,
    ) -> Result<Vec<Event>> {
        let access = self.read_access(user_id, baby_id).await?;
        let events = self.events_around(baby_id, date, date, tz, &access).await?;
        Ok(self.calendar.events_for_date(&events, date, tz, &access.kinds))
    }

    pub async fn calendar_month<Tz: TimeZone>(
        &self,
        user_id: &str,
        baby_id: &str,
        month: u32,
        year: i32,
        tz: &Tz,
    ) -> Result<CalendarMonth> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| DomainError::invalid_input(format!("no such month {}/{}", month, year)))?;
        let last = first
            .checked_add_days(Days::new(u64::from(self.calendar.days_in_month(month, year)) - 1))
            .ok_or_else(|| DomainError::invalid_input(format!("no such month {}/{}", month, year)))?;

        let access = self.read_access(user_id, baby_id).await?;
        let events = self.events_around(baby_id, first, last, tz, &access).await?;
        Ok(self
            .calendar
            .generate_calendar_month(month, year, &events, tz, &access.kinds))
    }

    /// Suggested amounts for the next feeding, optionally per feed type
    pub async fn feeding_presets(
        &self,
        user_id: &str,
        baby_id: &str,
        feed_type: Option<FeedType>,
        now: DateTime<Utc>,
    ) -> Result<PresetResponse> {
        self.presets_for(user_id, baby_id, EventKind::Feeding, feed_type, now).await
    }

    pub async fn pumping_presets(&self, user_id: &str, baby_id: &str, now: DateTime<Utc>) -> Result<PresetResponse> {
        self.presets_for(user_id, baby_id, EventKind::Pumping, None, now).await
    }

    /// Upload a photo for the event and store its URL on the event
    pub async fn attach_photo(&self, user_id: &str, event_id: &str, bytes: &[u8]) -> Result<Event> {
        if !self.settings.current().photo_authorization {
            return Err(DomainError::permission_denied("photo uploads are disabled").into());
        }
        let event = self.load_event(event_id).await?;
        self.check_write_access(user_id, &event.baby_id).await?;

        let url = self.blobs.upload(EVENT_PHOTO_TYPE, &event.id, bytes).await?;
        let event = event.with_photo_url(Some(url));
        self.event_repository.store_event(&event).await?;
        info!("Attached photo to event {}", event.id);
        Ok(event)
    }

    pub async fn remove_photo(&self, user_id: &str, event_id: &str) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        self.check_write_access(user_id, &event.baby_id).await?;

        self.blobs.delete(EVENT_PHOTO_TYPE, &event.id).await?;
        let event = event.with_photo_url(None);
        self.event_repository.store_event(&event).await?;
        Ok(event)
    }

    async fn presets_for(
        &self,
        user_id: &str,
        baby_id: &str,
        kind: EventKind,
        feed_type: Option<FeedType>,
        now: DateTime<Utc>,
    ) -> Result<PresetResponse> {
        self.read_access(user_id, baby_id).await?;
        // Undecodable and amount-less events are skipped, so read past the window
        let history: Vec<AmountSample> = self
            .event_repository
            .amount_history(baby_id, kind, feed_type, WINDOW_SIZE * 4)
            .await?
            .iter()
            .filter_map(AmountSample::from_event)
            .collect();
        let window = &history[history.len().saturating_sub(WINDOW_SIZE)..];
        Ok(self.presets.predict(window, now))
    }

    async fn events_around<Tz: TimeZone>(
        &self,
        baby_id: &str,
        first: NaiveDate,
        last: NaiveDate,
        tz: &Tz,
        access: &ReadAccess,
    ) -> Result<Vec<Event>> {
        // Unbounded below when the lookback would leave the supported date range
        let from = first
            .checked_sub_days(Days::new(SPAN_LOOKBACK_DAYS))
            .and_then(|start| Self::local_start(start, tz));
        let to = last
            .succ_opt()
            .and_then(|next| Self::local_start(next, tz))
            .map(|end| end - Duration::nanoseconds(1));
        let events = self
            .event_repository
            .list_events(baby_id, &access.kinds, from, to, None)
            .await?;
        Ok(events.into_iter().map(|event| Self::redact(event, access)).collect())
    }

    fn local_start<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        tz.from_local_datetime(&midnight)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    async fn load_event(&self, event_id: &str) -> Result<Event> {
        self.event_repository
            .get_event(event_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Event {}", event_id)).into())
    }

    async fn load_baby_for(&self, user_id: &str, baby_id: &str) -> Result<Baby> {
        let baby = self
            .baby_repository
            .get_baby(baby_id)
            .await
            .context("Failed to load baby")?
            .ok_or_else(|| DomainError::not_found(format!("Baby {}", baby_id)))?;
        if !baby.is_parent(user_id) {
            return Err(DomainError::permission_denied("not a parent of this baby").into());
        }
        Ok(baby)
    }

    /// The baby's creator and admins of a family sharing the baby see every
    /// kind; other parents see the kinds granted by the admin settings.
    async fn read_access(&self, user_id: &str, baby_id: &str) -> Result<ReadAccess> {
        let baby = self.load_baby_for(user_id, baby_id).await?;
        let families = self.family_repository.list_families_with_baby(baby_id).await?;
        let is_owner = baby.parent_ids.first().map(String::as_str) == Some(user_id)
            || families.iter().any(|family| family.is_admin(user_id));

        if is_owner {
            return Ok(ReadAccess {
                kinds: EventKind::ALL.to_vec(),
                hide_photos: false,
            });
        }
        Ok(ReadAccess {
            kinds: self.settings.current().read_permissions,
            hide_photos: families.iter().any(|family| !family.settings.share_photos),
        })
    }

    async fn check_write_access(&self, user_id: &str, baby_id: &str) -> Result<()> {
        let baby = self.load_baby_for(user_id, baby_id).await?;
        if baby.parent_ids.first().map(String::as_str) == Some(user_id) {
            return Ok(());
        }
        let families = self.family_repository.list_families_with_baby(baby_id).await?;
        let blocked = families
            .iter()
            .any(|family| !family.settings.members_can_edit_events && !family.is_admin(user_id));
        if blocked {
            return Err(DomainError::permission_denied("family members may not edit events").into());
        }
        Ok(())
    }

    fn redact(event: Event, access: &ReadAccess) -> Event {
        if access.hide_photos {
            event.with_photo_url(None)
        } else {
            event
        }
    }
}
