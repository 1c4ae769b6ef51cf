use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{info, warn};
use shared::{Baby, CreateBabyRequest, UpdateBabyRequest};
use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::domain::event_service::EVENT_PHOTO_TYPE;
use crate::storage::mappers::FamilyMapper;
use crate::storage::{
    BabyRepository, BlobStore, DocumentStore, EventRepository, FamilyRepository, WriteBatch,
};

pub const BABY_PHOTO_TYPE: &str = "babies";
const MAX_NAME_LENGTH: usize = 100;

/// Service for managing baby profiles
#[derive(Clone)]
pub struct BabyService {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    baby_repository: BabyRepository,
    event_repository: EventRepository,
    family_repository: FamilyRepository,
}

impl BabyService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            baby_repository: BabyRepository::new(store.clone()),
            event_repository: EventRepository::new(store.clone()),
            family_repository: FamilyRepository::new(store.clone()),
            store,
            blobs,
        }
    }

    /// Create a baby owned by `user_id`
    pub async fn create_baby(&self, user_id: &str, request: CreateBabyRequest, now: DateTime<Utc>) -> Result<Baby> {
        info!("Creating baby: name={}, birth_date={}", request.name, request.birth_date);

        let name = Self::validate_name(&request.name)?;
        Self::validate_birth_date(request.birth_date, now)?;
        Self::validate_measurements(&[
            request.birth_weight_kg,
            request.birth_length_cm,
            request.birth_head_circumference_cm,
        ])?;

        let mut baby = Baby::new(Baby::generate_id(), name, request.birth_date, now);
        baby.gender = request.gender;
        baby.birth_weight_kg = request.birth_weight_kg;
        baby.birth_length_cm = request.birth_length_cm;
        baby.birth_head_circumference_cm = request.birth_head_circumference_cm;
        baby.blood_type = request.blood_type;
        baby.allergies = Self::clean_list(request.allergies);
        baby.medical_conditions = Self::clean_list(request.medical_conditions);
        baby.pediatrician = request.pediatrician;
        baby.notes = request.notes;
        baby.add_parent(user_id);

        self.baby_repository.store_baby(&baby).await?;
        info!("Created baby: {} with ID: {}", baby.name, baby.id);
        Ok(baby)
    }

    pub async fn get_baby(&self, user_id: &str, baby_id: &str) -> Result<Baby> {
        let baby = self
            .baby_repository
            .get_baby(baby_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Baby {}", baby_id)))?;
        if !baby.is_parent(user_id) {
            warn!("User {} is not a parent of baby {}", user_id, baby_id);
            return Err(DomainError::permission_denied("not a parent of this baby").into());
        }
        Ok(baby)
    }

    pub async fn list_babies(&self, user_id: &str) -> Result<Vec<Baby>> {
        let babies = self.baby_repository.list_babies_for_parent(user_id).await?;
        info!("Found {} babies for user {}", babies.len(), user_id);
        Ok(babies)
    }

    /// Apply the fields present in `request`
    pub async fn update_baby(
        &self,
        user_id: &str,
        baby_id: &str,
        request: UpdateBabyRequest,
        now: DateTime<Utc>,
    ) -> Result<Baby> {
        let mut baby = self.load_editable(user_id, baby_id).await?;

        if let Some(name) = &request.name {
            baby.name = Self::validate_name(name)?;
        }
        if let Some(birth_date) = request.birth_date {
            Self::validate_birth_date(birth_date, now)?;
            baby.birth_date = birth_date;
        }
        Self::validate_measurements(&[
            request.birth_weight_kg,
            request.birth_length_cm,
            request.birth_head_circumference_cm,
        ])?;
        if let Some(gender) = request.gender {
            baby.gender = gender;
        }
        if request.birth_weight_kg.is_some() {
            baby.birth_weight_kg = request.birth_weight_kg;
        }
        if request.birth_length_cm.is_some() {
            baby.birth_length_cm = request.birth_length_cm;
        }
        if request.birth_head_circumference_cm.is_some() {
            baby.birth_head_circumference_cm = request.birth_head_circumference_cm;
        }
        if let Some(blood_type) = request.blood_type {
            baby.blood_type = blood_type;
        }
        if let Some(allergies) = request.allergies {
            baby.allergies = Self::clean_list(allergies);
        }
        if let Some(conditions) = request.medical_conditions {
            baby.medical_conditions = Self::clean_list(conditions);
        }
        if request.pediatrician.is_some() {
            baby.pediatrician = request.pediatrician;
        }
        if request.notes.is_some() {
            baby.notes = request.notes;
        }
        baby.updated_at = now;

        self.baby_repository.store_baby(&baby).await?;
        info!("Updated baby {}", baby.id);
        Ok(baby)
    }

    /// Delete the baby with all of its events in one batch, detaching it
    /// from every family that lists it. Only the creator or an admin of a
    /// family holding the baby may do this.
    pub async fn delete_baby(&self, user_id: &str, baby_id: &str, now: DateTime<Utc>) -> Result<()> {
        let baby = self.load_owned(user_id, baby_id).await?;
        let event_ids = self.event_repository.event_ids_for_baby(baby_id).await?;
        let families = self.family_repository.list_families_with_baby(baby_id).await?;

        let mut batch = WriteBatch::new();
        batch.delete(BabyRepository::COLLECTION, baby_id);
        for event_id in &event_ids {
            batch.delete(EventRepository::COLLECTION, event_id);
        }
        for mut family in families {
            family.baby_ids.retain(|id| id != baby_id);
            family.touch(now);
            batch.put(FamilyRepository::COLLECTION, FamilyMapper::to_document(&family));
        }
        self.store.commit(batch).await?;
        info!("Deleted baby {} and {} events", baby_id, event_ids.len());

        // Photos are best effort once the records are gone
        if baby.photo_url.is_some() {
            if let Err(e) = self.blobs.delete(BABY_PHOTO_TYPE, baby_id).await {
                warn!("Failed to delete photo of baby {}: {:#}", baby_id, e);
            }
        }
        for event_id in &event_ids {
            if let Err(e) = self.blobs.delete(EVENT_PHOTO_TYPE, event_id).await {
                warn!("Failed to delete photo of event {}: {:#}", event_id, e);
            }
        }
        Ok(())
    }

    pub async fn upload_photo(&self, user_id: &str, baby_id: &str, bytes: &[u8], now: DateTime<Utc>) -> Result<Baby> {
        let mut baby = self.load_editable(user_id, baby_id).await?;
        let url = self.blobs.upload(BABY_PHOTO_TYPE, baby_id, bytes).await?;
        baby.photo_url = Some(url);
        baby.updated_at = now;
        self.baby_repository.store_baby(&baby).await?;
        Ok(baby)
    }

    pub async fn remove_photo(&self, user_id: &str, baby_id: &str, now: DateTime<Utc>) -> Result<Baby> {
        let mut baby = self.load_editable(user_id, baby_id).await?;
        self.blobs.delete(BABY_PHOTO_TYPE, baby_id).await?;
        baby.photo_url = None;
        baby.updated_at = now;
        self.baby_repository.store_baby(&baby).await?;
        Ok(baby)
    }

    /// The creator always; other parents unless a family sharing the baby
    /// restricts edits to its admins
    async fn load_editable(&self, user_id: &str, baby_id: &str) -> Result<Baby> {
        let baby = self.get_baby(user_id, baby_id).await?;
        if Self::is_creator(&baby, user_id) {
            return Ok(baby);
        }
        let families = self.family_repository.list_families_with_baby(baby_id).await?;
        let blocked = families
            .iter()
            .any(|family| !family.settings.members_can_edit_events && !family.is_admin(user_id));
        if blocked {
            warn!("User {} may not edit baby {}", user_id, baby_id);
            return Err(DomainError::permission_denied("family members may not edit this baby").into());
        }
        Ok(baby)
    }

    async fn load_owned(&self, user_id: &str, baby_id: &str) -> Result<Baby> {
        let baby = self.get_baby(user_id, baby_id).await?;
        if Self::is_creator(&baby, user_id) {
            return Ok(baby);
        }
        let families = self.family_repository.list_families_with_baby(baby_id).await?;
        if families.iter().any(|family| family.is_admin(user_id)) {
            return Ok(baby);
        }
        warn!("User {} may not delete baby {}", user_id, baby_id);
        Err(DomainError::permission_denied("only the creator or a family admin may delete this baby").into())
    }

    fn is_creator(baby: &Baby, user_id: &str) -> bool {
        baby.parent_ids.first().map(String::as_str) == Some(user_id)
    }

    fn validate_name(name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid_input("baby name cannot be empty").into());
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(DomainError::invalid_input("baby name cannot exceed 100 characters").into());
        }
        Ok(name.to_string())
    }

    fn validate_birth_date(birth_date: chrono::NaiveDate, now: DateTime<Utc>) -> Result<()> {
        if birth_date > now.date_naive() {
            return Err(DomainError::invalid_input("birth date cannot be in the future").into());
        }
        Ok(())
    }

    fn validate_measurements(values: &[Option<f64>]) -> Result<()> {
        if values.iter().flatten().any(|value| !(value.is_finite() && *value > 0.0)) {
            return Err(DomainError::invalid_input("birth measurements must be positive").into());
        }
        Ok(())
    }

    fn clean_list(values: Vec<String>) -> Vec<String> {
        let mut cleaned: Vec<String> = Vec::new();
        for value in values {
            let value = value.trim();
            if !value.is_empty() && !cleaned.iter().any(|existing| existing == value) {
                cleaned.push(value.to_string());
            }
        }
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::RepositoryTestHelper;
    use chrono::{NaiveDate, TimeZone};
    use shared::{BloodType, Event, EventDetails, Family, FamilySettings, Gender, GrowthDetails};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    fn request(name: &str) -> CreateBabyRequest {
        CreateBabyRequest {
            name: name.to_string(),
            birth_date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            gender: Gender::Female,
            birth_weight_kg: Some(3.2),
            birth_length_cm: None,
            birth_head_circumference_cm: None,
            blood_type: BloodType::Unknown,
            allergies: vec![" peanuts ".to_string(), "".to_string(), "peanuts".to_string()],
            medical_conditions: Vec::new(),
            pediatrician: None,
            notes: None,
        }
    }

    fn service(helper: &RepositoryTestHelper) -> BabyService {
        BabyService::new(helper.store.clone(), helper.blobs.clone())
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let helper = RepositoryTestHelper::new().unwrap();
        let service = service(&helper);

        let baby = service.create_baby("user-1", request("  Ada "), now()).await.unwrap();
        assert_eq!(baby.name, "Ada");
        assert_eq!(baby.parent_ids, vec!["user-1"]);
        assert_eq!(baby.allergies, vec!["peanuts"]);

        assert_eq!(service.list_babies("user-1").await.unwrap(), vec![baby.clone()]);
        assert!(service.list_babies("user-2").await.unwrap().is_empty());
        assert!(service.get_baby("user-2", &baby.id).await.is_err());
    }

    #[tokio::test]
    async fn test_create_validation() {
        let helper = RepositoryTestHelper::new().unwrap();
        let service = service(&helper);

        assert!(service.create_baby("user-1", request("   "), now()).await.is_err());
        assert!(service.create_baby("user-1", request(&"x".repeat(101)), now()).await.is_err());

        let mut future = request("Ada");
        future.birth_date = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let error = service.create_baby("user-1", future, now()).await.unwrap_err();
        assert!(matches!(error.downcast_ref::<DomainError>(), Some(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let helper = RepositoryTestHelper::new().unwrap();
        let service = service(&helper);
        let baby = service.create_baby("user-1", request("Ada"), now()).await.unwrap();

        let later = now() + chrono::Duration::hours(1);
        let update = UpdateBabyRequest {
            name: Some("Ada Grace".to_string()),
            blood_type: Some(BloodType::APositive),
            ..UpdateBabyRequest::default()
        };
        let updated = service.update_baby("user-1", &baby.id, update, later).await.unwrap();
        assert_eq!(updated.name, "Ada Grace");
        assert_eq!(updated.blood_type, BloodType::APositive);
        assert_eq!(updated.birth_weight_kg, Some(3.2));
        assert_eq!(updated.updated_at, later);
    }

    #[tokio::test]
    async fn test_delete_cascades_events_and_family_links() {
        let helper = RepositoryTestHelper::new().unwrap();
        let service = service(&helper);
        let baby = service.create_baby("user-1", request("Ada"), now()).await.unwrap();
        let baby = service.upload_photo("user-1", &baby.id, b"jpeg", now()).await.unwrap();

        for i in 0..3 {
            let event = Event {
                id: format!("e{}", i),
                baby_id: baby.id.clone(),
                timestamp: now(),
                notes: None,
                photo_url: None,
                details: EventDetails::Growth(GrowthDetails {
                    weight_kg: Some(3.5),
                    height_cm: None,
                    head_circumference_cm: None,
                }),
            };
            helper.event_repo.store_event(&event).await.unwrap();
        }
        let family = Family {
            id: "family-1".to_string(),
            name: "Lovelace".to_string(),
            invite_code: "ABC123".to_string(),
            admin_ids: vec!["user-1".to_string()],
            member_ids: vec!["user-1".to_string()],
            baby_ids: vec![baby.id.clone(), "other".to_string()],
            settings: FamilySettings::default(),
            created_at: now(),
            updated_at: now(),
        };
        helper.family_repo.store_family(&family).await.unwrap();

        service.delete_baby("user-1", &baby.id, now()).await.unwrap();

        assert!(helper.baby_repo.get_baby(&baby.id).await.unwrap().is_none());
        assert!(helper.event_repo.event_ids_for_baby(&baby.id).await.unwrap().is_empty());
        let family = helper.family_repo.get_family("family-1").await.unwrap().unwrap();
        assert_eq!(family.baby_ids, vec!["other"]);
        assert!(family.updated_at > now());
        assert!(helper.blobs.download(BABY_PHOTO_TYPE, &baby.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invited_parent_cannot_delete_and_respects_edit_policy() {
        let helper = RepositoryTestHelper::new().unwrap();
        let service = service(&helper);
        let baby = service.create_baby("alice", request("Ada"), now()).await.unwrap();
        let mut shared_baby = baby.clone();
        shared_baby.add_parent("bob");
        helper.baby_repo.store_baby(&shared_baby).await.unwrap();

        let mut family = Family {
            id: "family-1".to_string(),
            name: "Lovelace".to_string(),
            invite_code: "ABC123".to_string(),
            admin_ids: vec!["alice".to_string()],
            member_ids: vec!["alice".to_string(), "bob".to_string()],
            baby_ids: vec![baby.id.clone()],
            settings: FamilySettings {
                members_can_edit_events: false,
                ..FamilySettings::default()
            },
            created_at: now(),
            updated_at: now(),
        };
        helper.family_repo.store_family(&family).await.unwrap();

        let error = service.delete_baby("bob", &baby.id, now()).await.unwrap_err();
        assert!(matches!(error.downcast_ref::<DomainError>(), Some(DomainError::PermissionDenied(_))));
        assert!(helper.baby_repo.get_baby(&baby.id).await.unwrap().is_some());

        let rename = UpdateBabyRequest {
            name: Some("Bobby".to_string()),
            ..UpdateBabyRequest::default()
        };
        let error = service.update_baby("bob", &baby.id, rename.clone(), now()).await.unwrap_err();
        assert!(matches!(error.downcast_ref::<DomainError>(), Some(DomainError::PermissionDenied(_))));
        assert!(service.upload_photo("bob", &baby.id, b"jpeg", now()).await.is_err());

        family.settings.members_can_edit_events = true;
        helper.family_repo.store_family(&family).await.unwrap();
        let renamed = service.update_baby("bob", &baby.id, rename, now()).await.unwrap();
        assert_eq!(renamed.name, "Bobby");
        assert!(service.delete_baby("bob", &baby.id, now()).await.is_err());

        family.admin_ids.push("bob".to_string());
        helper.family_repo.store_family(&family).await.unwrap();
        service.delete_baby("bob", &baby.id, now()).await.unwrap();
        assert!(helper.baby_repo.get_baby(&baby.id).await.unwrap().is_none());
    }
}
